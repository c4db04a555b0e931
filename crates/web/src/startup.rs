//! Startup checks and application state assembly.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use tubesense_analysis::SentimentAnalyzer;
use tubesense_api::{
    init_pool, ApiConfig, ApiError, ApiServer, AppState, Repository, YouTubeClient,
};
use tubesense_core::TubesenseConfig;

use crate::error::{WebError, WebResult};

/// Outcome of the pre-start checks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequirementReport {
    /// Problems that prevent serving.
    pub errors: Vec<String>,
    /// Problems that only degrade functionality.
    pub warnings: Vec<String>,
}

impl RequirementReport {
    /// True when nothing blocks startup.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Log every finding.
    pub fn log(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        for error in &self.errors {
            tracing::error!("{}", error);
        }
    }
}

/// Check the files and settings the server needs.
///
/// The pipeline artifact is required. A missing API key or missing optional
/// artifacts are reported as warnings.
pub fn check_requirements(config: &TubesenseConfig) -> RequirementReport {
    let mut report = RequirementReport::default();

    let pipeline = config.model.pipeline_path();
    if !pipeline.is_file() {
        report.errors.push(format!(
            "Required model artifact not found: {}",
            pipeline.display()
        ));
    }

    for name in &config.model.optional_files {
        let path = config.model.artifact_dir.join(name);
        if !path.exists() {
            report
                .warnings
                .push(format!("Optional model artifact not found: {}", path.display()));
        }
    }

    let key_missing = config
        .youtube
        .api_key
        .as_deref()
        .map(|k| k.trim().is_empty())
        .unwrap_or(true);
    if key_missing {
        report.warnings.push(
            "YOUTUBE_API_KEY is not set; comment fetching will fail until it is configured"
                .to_string(),
        );
    }

    report
}

/// Open and migrate the database, load the model and build the YouTube client.
pub async fn build_state(config: &TubesenseConfig) -> WebResult<AppState> {
    let pool = init_pool(&config.database).await.map_err(ApiError::from)?;
    info!("Database ready at {}", config.database.sqlite_path.display());

    let model_config = config.model.clone();
    let analyzer = tokio::task::spawn_blocking(move || SentimentAnalyzer::load(&model_config))
        .await
        .map_err(|e| WebError::Startup(format!("model loading task failed: {}", e)))??;
    if !analyzer.is_loaded() {
        warn!("Serving without a sentiment model; /analyze will return 503");
    }

    let client = YouTubeClient::new(&config.youtube).map_err(ApiError::from)?;

    Ok(AppState {
        repo: Repository::new(Arc::new(pool)),
        analyzer: Arc::new(analyzer),
        comments: Arc::new(client),
        max_comments: config.youtube.max_comments,
    })
}

/// Run the checks, assemble the application and serve until shutdown.
pub async fn serve(config: TubesenseConfig) -> WebResult<()> {
    let report = check_requirements(&config);
    report.log();
    if !report.is_ok() {
        return Err(WebError::Startup(report.errors.join("; ")));
    }

    let state = build_state(&config).await?;
    let api_config = ApiConfig::from_core_config(&config);
    let app = crate::build_app(state, &api_config);

    info!("TubeSense available at http://{}", api_config.bind_addr);
    ApiServer::new(api_config, app).run().await?;
    Ok(())
}
