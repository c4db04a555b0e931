//! Application constants and configuration defaults.

/// Default HTTP server port.
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Default HTTP bind host.
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Default SQLite file holding stored analyses.
pub const DEFAULT_ANALYSIS_DB: &str = "sentiment_analysis.db";

/// Default SQLite file holding the model version registry.
pub const DEFAULT_REGISTRY_DB: &str = "model_versions.db";

/// Default directory for model version backups.
pub const DEFAULT_BACKUP_DIR: &str = "model_backups";

/// Required logistic-regression pipeline artifact.
pub const PIPELINE_ARTIFACT: &str = "LR_Pipeline.json";

/// Optional deep model artifact, versioned but not used for inference.
pub const DEEP_MODEL_ARTIFACT: &str = "BestModel.h5";

/// Optional tokenizer artifact.
pub const TOKENIZER_ARTIFACT: &str = "tokenizer.json";

/// YouTube Data API v3 base URL.
pub const YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Default number of comments fetched per analysis.
pub const DEFAULT_MAX_COMMENTS: u32 = 100;

/// Maximum page size accepted by the commentThreads endpoint.
pub const YOUTUBE_MAX_PAGE_SIZE: u32 = 100;

/// Default database connection pool size.
pub const DEFAULT_DB_POOL_SIZE: u32 = 10;

/// Environment variable carrying the YouTube API key.
pub const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";

/// Environment variable overriding the HTTP port.
pub const ENV_PORT: &str = "PORT";

/// Environment variable overriding the HTTP bind host.
pub const ENV_HOST: &str = "HOST";

/// Environment variable overriding the analyses database path.
pub const ENV_DB_PATH: &str = "TUBESENSE_DB_PATH";

/// Environment variable overriding the model artifact directory.
pub const ENV_MODEL_DIR: &str = "TUBESENSE_MODEL_DIR";

/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "TUBESENSE_LOG_LEVEL";
