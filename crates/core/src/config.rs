use crate::constants::*;
use crate::Error;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Main configuration for TubeSense.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TubesenseConfig {
    /// HTTP server configuration.
    pub http: HttpConfig,

    /// Database configuration.
    pub database: DatabaseConfig,

    /// YouTube Data API configuration.
    pub youtube: YouTubeConfig,

    /// Model artifact and registry configuration.
    pub model: ModelConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to bind to.
    pub port: u16,

    /// Enable CORS.
    pub enable_cors: bool,

    /// Allowed CORS origins, empty means any origin.
    pub cors_allowed_origins: Vec<String>,

    /// Request timeout in seconds.
    pub request_timeout: u64,

    /// Enable request logging.
    pub enable_request_logging: bool,

    /// Directory served under `/static`.
    pub static_dir: PathBuf,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    pub sqlite_path: PathBuf,

    /// Maximum number of connections in pool.
    pub max_connections: u32,

    /// Connection timeout in seconds.
    pub connection_timeout: u64,

    /// Enable WAL mode.
    pub enable_wal: bool,
}

/// YouTube Data API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// API key, usually supplied through `YOUTUBE_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL of the Data API.
    pub base_url: String,

    /// Comments fetched per analysis.
    pub max_comments: u32,

    /// Request timeout in seconds.
    pub request_timeout: u64,
}

/// Model artifact and registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the live model artifacts.
    pub artifact_dir: PathBuf,

    /// Required pipeline artifact file name.
    pub pipeline_file: String,

    /// Optional artifact file names that are versioned alongside the pipeline.
    pub optional_files: Vec<String>,

    /// Tokenizer artifact file name, loaded when present.
    pub tokenizer_file: String,

    /// Directory holding version backups.
    pub backup_dir: PathBuf,

    /// SQLite file of the version registry.
    pub registry_db: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: LogLevel,

    /// Log format.
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level.
    Error,

    /// Warning level.
    Warn,

    /// Info level.
    Info,

    /// Debug level.
    Debug,

    /// Trace level.
    Trace,
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format.
    Json,

    /// Text format.
    Text,

    /// Pretty format.
    Pretty,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse a level name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

impl TubesenseConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::FileSystem(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content).map_err(|e| Error::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Resolve the runtime configuration: defaults, then the optional TOML file,
    /// then `.env`, then process environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::load(path)?,
            Some(path) => {
                return Err(Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )))
            }
            None => Self::default(),
        };

        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env file: {}", e),
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = get(ENV_YOUTUBE_API_KEY) {
            self.youtube.api_key = Some(key);
        }
        if let Some(port) = get(ENV_PORT) {
            self.http.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT value: {}", port)))?;
        }
        if let Some(host) = get(ENV_HOST) {
            self.http.host = host;
        }
        if let Some(path) = get(ENV_DB_PATH) {
            self.database.sqlite_path = PathBuf::from(path);
        }
        if let Some(dir) = get(ENV_MODEL_DIR) {
            self.model.artifact_dir = PathBuf::from(dir);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.logging.level = LogLevel::parse(&level)
                .ok_or_else(|| Error::Config(format!("invalid log level: {}", level)))?;
        }
        Ok(())
    }

    /// Socket address string for the HTTP server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

impl ModelConfig {
    /// Path of the required pipeline artifact.
    pub fn pipeline_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.pipeline_file)
    }

    /// Path of the tokenizer artifact.
    pub fn tokenizer_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.tokenizer_file)
    }

    /// Every artifact file name tracked by the version registry, required first.
    pub fn tracked_files(&self) -> Vec<String> {
        let mut files = vec![self.pipeline_file.clone()];
        for name in &self.optional_files {
            if !files.contains(name) {
                files.push(name.clone());
            }
        }
        files
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            enable_cors: true,
            cors_allowed_origins: Vec::new(),
            request_timeout: 60,
            enable_request_logging: true,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from(DEFAULT_ANALYSIS_DB),
            max_connections: DEFAULT_DB_POOL_SIZE,
            connection_timeout: 10,
            enable_wal: true,
        }
    }
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: YOUTUBE_API_BASE_URL.to_string(),
            max_comments: DEFAULT_MAX_COMMENTS,
            request_timeout: 30,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("."),
            pipeline_file: PIPELINE_ARTIFACT.to_string(),
            optional_files: vec![
                DEEP_MODEL_ARTIFACT.to_string(),
                TOKENIZER_ARTIFACT.to_string(),
            ],
            tokenizer_file: TOKENIZER_ARTIFACT.to_string(),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            registry_db: PathBuf::from(DEFAULT_REGISTRY_DB),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            ("YOUTUBE_API_KEY", "abc123"),
            ("PORT", "9100"),
            ("TUBESENSE_LOG_LEVEL", "DEBUG"),
        ]
        .into_iter()
        .collect();

        let mut config = TubesenseConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .expect("overrides should apply");

        assert_eq!(config.youtube.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.http.port, 9100);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.bind_address(), "0.0.0.0:9100");
    }

    #[test]
    fn path_and_host_overrides_apply() {
        let env: HashMap<&str, &str> = [
            (ENV_HOST, "127.0.0.1"),
            (ENV_DB_PATH, "/data/analyses.db"),
            (ENV_MODEL_DIR, "/models"),
        ]
        .into_iter()
        .collect();

        let mut config = TubesenseConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .expect("overrides should apply");

        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.database.sqlite_path, PathBuf::from("/data/analyses.db"));
        assert_eq!(config.model.pipeline_path(), PathBuf::from("/models").join(PIPELINE_ARTIFACT));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = TubesenseConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == "PORT").then(|| "eighty".to_string()))
            .expect_err("non-numeric port must fail");
        assert!(err.to_string().contains("invalid PORT value"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = TubesenseConfig::default();
        config
            .apply_env_overrides(|_| Some("   ".to_string()))
            .expect("blank values are skipped");
        assert!(config.youtube.api_key.is_none());
        assert_eq!(config.http.port, DEFAULT_HTTP_PORT);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tubesense.toml");
        std::fs::write(
            &path,
            "[http]\nport = 8123\n\n[model]\nartifact_dir = \"models\"\n",
        )
        .expect("write config");

        let config = TubesenseConfig::load(&path).expect("config parses");
        assert_eq!(config.http.port, 8123);
        assert_eq!(config.http.host, DEFAULT_HTTP_HOST);
        assert_eq!(config.model.pipeline_path(), PathBuf::from("models").join(PIPELINE_ARTIFACT));
        assert_eq!(config.youtube.max_comments, DEFAULT_MAX_COMMENTS);
    }

    #[test]
    fn tracked_files_put_pipeline_first_without_duplicates() {
        let mut model = ModelConfig::default();
        model.optional_files.push(PIPELINE_ARTIFACT.to_string());
        let files = model.tracked_files();
        assert_eq!(files[0], PIPELINE_ARTIFACT);
        assert_eq!(files.len(), 3);
    }
}
