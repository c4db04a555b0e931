//! CLI application entry point and configuration.
//!
//! This module loads the TubeSense configuration, installs logging and
//! dispatches the parsed command.

use crate::commands::{
    AnalyzeArgs, Cli, Commands, ModelCommand, OutputFormat, ServeArgs, ValidateCommand,
};
use crate::error::{CliError, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tubesense_analysis::ml::{
    load_training_samples, train_pipeline, LogisticPipeline, TrainingOptions,
};
use tubesense_analysis::validation::{
    CheckStatus, ModelValidator, PerformanceReport, PerformanceValidator, ValidationReport,
    PERFORMANCE_REPORT_FILE, VALIDATION_REPORT_FILE,
};
use tubesense_analysis::versioning::{FileIntegrity, IntegrityReport, ModelVersion};
use tubesense_analysis::{ModelVersionManager, SentimentAnalyzer, TextCleaner};
use tubesense_api::youtube::extract_video_id;
use tubesense_api::YouTubeClient;
use tubesense_core::{AnalysisReport, ScoredComment, Sentiment, TubesenseConfig};

/// Comments shown per sentiment in text output.
const TOP_COMMENTS: usize = 5;

/// Configuration for the CLI application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to configuration file.
    pub config_path: Option<PathBuf>,
    /// Logging verbosity level.
    pub verbosity: u8,
    /// Resolved TubeSense settings.
    pub settings: TubesenseConfig,
}

/// Main CLI application.
#[derive(Debug)]
pub struct App {
    /// Application configuration.
    pub config: AppConfig,
    /// Parsed CLI arguments.
    pub cli: Cli,
}

impl App {
    /// Create a new application instance from command line arguments.
    pub fn new() -> Result<Self> {
        Self::from_cli(Cli::parse())
    }

    /// Create an application instance from already parsed arguments.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let config = Self::load_config(&cli)?;
        Ok(Self { config, cli })
    }

    /// Load configuration from file and environment.
    fn load_config(cli: &Cli) -> Result<AppConfig> {
        let settings = TubesenseConfig::resolve(cli.config.as_deref())?;
        Ok(AppConfig {
            config_path: cli.config.clone(),
            verbosity: cli.verbose,
            settings,
        })
    }

    /// Run the application.
    pub fn run(self) -> Result<()> {
        self.setup_logging();
        if let Some(path) = &self.config.config_path {
            debug!("Using configuration {}", path.display());
        }

        match &self.cli.command {
            Commands::Serve(args) => self.handle_serve(args),
            Commands::Analyze(args) => self.handle_analyze(args),
            Commands::Model(args) => self.handle_model(&args.command),
            Commands::Validate(args) => self.handle_validate(&args.command),
        }
    }

    /// Set up logging based on configuration and verbosity.
    fn setup_logging(&self) {
        // A subscriber may already be installed, e.g. in tests.
        tubesense_web::logging::init_tracing(&self.config.settings.logging, self.config.verbosity)
            .ok();
    }

    fn handle_serve(&self, args: &ServeArgs) -> Result<()> {
        let mut settings = self.config.settings.clone();
        if let Some(host) = &args.host {
            settings.http.host = host.trim().to_string();
        }
        if let Some(port) = args.port {
            settings.http.port = port;
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::Internal(format!("failed to build runtime: {}", e)))?;
        runtime.block_on(tubesense_web::serve(settings))?;
        Ok(())
    }

    fn handle_analyze(&self, args: &AnalyzeArgs) -> Result<()> {
        let settings = &self.config.settings;
        let video_id = extract_video_id(&args.url)
            .ok_or_else(|| CliError::Argument("Invalid YouTube URL".to_string()))?;

        let analyzer = SentimentAnalyzer::load(&settings.model)?;
        if !analyzer.is_loaded() {
            return Err(CliError::Analysis("Model not loaded".to_string()));
        }
        let client = YouTubeClient::new(&settings.youtube)?;
        let max = args.max_comments.unwrap_or(settings.youtube.max_comments);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::Internal(format!("failed to build runtime: {}", e)))?;
        let (video_info, comments) = runtime.block_on(async {
            let info = client.get_video_info(&video_id).await?;
            let comments = client.get_video_comments(&video_id, max).await?;
            Ok::<_, CliError>((info, comments))
        })?;
        if comments.is_empty() {
            return Err(CliError::Command(
                "No comments found for this video".to_string(),
            ));
        }

        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        let sentiments = analyzer.analyze_batch(&texts)?;
        let scored = comments
            .iter()
            .zip(sentiments)
            .map(|(comment, sentiment)| ScoredComment::new(comment, sentiment))
            .collect();
        let report = AnalysisReport::build(video_info, scored);
        info!(
            "Analysed {} comments for {}",
            report.statistics.total_comments, video_id
        );

        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print!("{}", render_report(&report)),
        }
        Ok(())
    }

    fn handle_model(&self, command: &ModelCommand) -> Result<()> {
        let model_config = self.config.settings.model.clone();

        if let ModelCommand::Train {
            data,
            output,
            epochs,
        } = command
        {
            let output = output.clone().unwrap_or_else(|| model_config.pipeline_path());
            return train_model(data, &output, *epochs);
        }

        let mut manager = ModelVersionManager::open(model_config)?;
        match command {
            ModelCommand::Create { tag, description } => {
                let version = manager.create_version(tag, description)?;
                println!(
                    "Created version {} with {} file(s)",
                    version.version_tag,
                    version.model_files.len()
                );
            }
            ModelCommand::Deploy { tag } => {
                manager.deploy_version(tag)?;
                println!("Deployed version {}", tag);
            }
            ModelCommand::Rollback { tag } => {
                manager.rollback_to_version(tag)?;
                println!("Rolled back to version {}", tag);
            }
            ModelCommand::List { format } => {
                let versions = manager.list_versions()?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&versions)?)
                    }
                    OutputFormat::Text => print!("{}", render_versions(&versions)),
                }
            }
            ModelCommand::Current => match manager.current_version()? {
                Some(tag) => println!("{}", tag),
                None => println!("No active version"),
            },
            ModelCommand::Validate { tag } => {
                let report = manager.validate_version_integrity(tag)?;
                print!("{}", render_integrity(&report));
                if !report.ok {
                    return Err(CliError::Validation(format!(
                        "version {} does not match the artifact directory",
                        tag
                    )));
                }
            }
            ModelCommand::Cleanup { keep } => {
                let removed = manager.cleanup_old_versions(*keep)?;
                if removed.is_empty() {
                    println!("Nothing to clean up");
                } else {
                    println!("Removed {} version(s): {}", removed.len(), removed.join(", "));
                }
            }
            ModelCommand::Train { .. } => {}
        }
        Ok(())
    }

    fn handle_validate(&self, command: &ValidateCommand) -> Result<()> {
        let model_config = self.config.settings.model.clone();

        match command {
            ValidateCommand::Models { report } => {
                let path = report
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(VALIDATION_REPORT_FILE));
                let result = ModelValidator::new(model_config)
                    .with_report_path(&path)
                    .run()?;
                print!("{}", render_validation(&result));
                println!("Report written to {}", path.display());
                if !result.success() {
                    return Err(CliError::Validation(format!(
                        "{} check(s) failed",
                        result.failed
                    )));
                }
            }
            ValidateCommand::Performance {
                record_version,
                report,
            } => {
                let path = report
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(PERFORMANCE_REPORT_FILE));
                let result = PerformanceValidator::new(model_config.clone())
                    .with_report_path(&path)
                    .run()?;
                print!("{}", render_performance(&result));
                println!("Report written to {}", path.display());

                if let Some(tag) = record_version {
                    let manager = ModelVersionManager::open(model_config)?;
                    manager.record_metrics(tag, &serde_json::to_value(&result)?)?;
                    println!("Recorded metrics on version {}", tag);
                }
                if !result.success() {
                    return Err(CliError::Validation(
                        "performance thresholds not met".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn train_model(data: &Path, output: &Path, epochs: Option<usize>) -> Result<()> {
    let samples = load_training_samples(data)?;
    let mut options = TrainingOptions::default();
    if let Some(epochs) = epochs {
        options.epochs = epochs;
    }

    let cleaner = TextCleaner::new()?;
    let artifact = train_pipeline(&cleaner, &samples, &options)?;
    let features = artifact.vocabulary.len();

    let analyzer =
        SentimentAnalyzer::with_model(Arc::new(LogisticPipeline::from_artifact(artifact.clone())?))?;
    let texts: Vec<&str> = samples.iter().map(|s| s.text.as_str()).collect();
    let predictions = analyzer.analyze_batch(&texts)?;
    let correct = predictions
        .iter()
        .zip(&samples)
        .filter(|(p, s)| p.score() == s.label)
        .count();

    artifact.save(output)?;
    println!(
        "Trained on {} samples, {} features, training accuracy {:.2}%",
        samples.len(),
        features,
        correct as f64 / samples.len() as f64 * 100.0
    );
    println!("Pipeline written to {}", output.display());
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

fn display_time(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn top_comments(report: &AnalysisReport, sentiment: Sentiment) -> Vec<&ScoredComment> {
    let mut comments: Vec<&ScoredComment> = match sentiment {
        Sentiment::Positive => report.positive_comments.iter().collect(),
        Sentiment::Negative => report.negative_comments.iter().collect(),
    };
    comments.sort_by(|a, b| b.likes.cmp(&a.likes));
    comments.truncate(TOP_COMMENTS);
    comments
}

/// Human-readable summary of an analysis.
pub fn render_report(report: &AnalysisReport) -> String {
    let info = &report.video_info;
    let stats = &report.statistics;
    let mut out = String::new();

    out.push_str(&format!("Video:    {}\n", info.title));
    out.push_str(&format!(
        "Channel:  {} ({} views, {} likes)\n",
        info.channel_title, info.view_count, info.like_count
    ));
    out.push_str(&format!("Comments: {}\n", stats.total_comments));
    out.push_str(&format!(
        "Positive: {} ({:.2}%)\n",
        stats.positive_count, stats.positive_percentage
    ));
    out.push_str(&format!(
        "Negative: {} ({:.2}%)\n",
        stats.negative_count, stats.negative_percentage
    ));

    for sentiment in [Sentiment::Positive, Sentiment::Negative] {
        let comments = top_comments(report, sentiment);
        if comments.is_empty() {
            continue;
        }
        out.push_str(&format!("\nTop {} comments:\n", sentiment.label().to_lowercase()));
        for comment in comments {
            out.push_str(&format!(
                "  [{:>4}] {}: {}\n",
                comment.likes,
                comment.author,
                truncate(&comment.text, 100)
            ));
        }
    }
    out
}

/// Table of registered versions.
pub fn render_versions(versions: &[ModelVersion]) -> String {
    if versions.is_empty() {
        return "No model versions registered\n".to_string();
    }

    let mut out = format!(
        "{:<20} {:<6} {:<19} {:<19} {}\n",
        "VERSION", "ACTIVE", "CREATED", "DEPLOYED", "DESCRIPTION"
    );
    for version in versions {
        out.push_str(&format!(
            "{:<20} {:<6} {:<19} {:<19} {}\n",
            version.version_tag,
            if version.is_active { "*" } else { "" },
            display_time(&version.created_at),
            version
                .deployed_at
                .as_deref()
                .map(display_time)
                .unwrap_or_else(|| "-".to_string()),
            version.description
        ));
    }
    out
}

fn render_integrity(report: &IntegrityReport) -> String {
    let mut out = format!("Integrity of version {}:\n", report.version_tag);
    for check in &report.files {
        let status = match check.status {
            FileIntegrity::Ok => "OK",
            FileIntegrity::Mismatch => "MISMATCH",
            FileIntegrity::Missing => "MISSING",
        };
        out.push_str(&format!("  {:<9} {}\n", status, check.file));
    }
    out.push_str(if report.ok {
        "All files match\n"
    } else {
        "Integrity check failed\n"
    });
    out
}

fn render_validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    for result in &report.results {
        let status = match result.status {
            CheckStatus::Passed => "PASSED",
            CheckStatus::Failed => "FAILED",
            CheckStatus::Warning => "WARNING",
        };
        match &result.error {
            Some(error) => out.push_str(&format!("[{}] {}: {}\n", status, result.subject(), error)),
            None => out.push_str(&format!("[{}] {}\n", status, result.subject())),
        }
    }
    out.push_str(&format!(
        "{} passed, {} failed, {} warning(s)\n",
        report.passed, report.failed, report.warnings
    ));
    out
}

fn render_performance(report: &PerformanceReport) -> String {
    let mut out = String::new();
    for (name, metric) in &report.metrics {
        let status = if metric.skipped {
            "SKIPPED"
        } else if metric.passed {
            "PASSED"
        } else {
            "FAILED"
        };
        out.push_str(&format!(
            "[{}] {}: {:.3} (threshold {})\n",
            status, name, metric.value, metric.threshold
        ));
        if let Some(error) = &metric.error {
            out.push_str(&format!("    {}\n", error));
        }
    }
    out
}

/// Parse arguments and run the application.
pub fn run() -> Result<()> {
    let app = App::new()?;
    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubesense_analysis::versioning::ArtifactFile;
    use tubesense_core::{Comment, VideoInfo};

    fn comment(author: &str, text: &str, likes: u64) -> Comment {
        Comment {
            id: author.to_string(),
            text: text.to_string(),
            author: author.to_string(),
            author_channel: String::new(),
            likes,
            published_at: String::new(),
            updated_at: String::new(),
            total_reply_count: 0,
            video_id: None,
        }
    }

    fn report() -> AnalysisReport {
        let video = VideoInfo {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Test video".to_string(),
            description: String::new(),
            channel_title: "Channel".to_string(),
            published_at: String::new(),
            view_count: 100,
            like_count: 7,
            comment_count: 3,
            thumbnail: String::new(),
            tags: Vec::new(),
        };
        AnalysisReport::build(
            video,
            vec![
                ScoredComment::new(&comment("ann", "nice", 1), Sentiment::Positive),
                ScoredComment::new(&comment("bob", "great", 9), Sentiment::Positive),
                ScoredComment::new(&comment("cy", "awful", 3), Sentiment::Negative),
            ],
        )
    }

    #[test]
    fn report_lists_most_liked_first() {
        let text = render_report(&report());
        assert!(text.contains("Positive: 2 (66.67%)"));
        assert!(text.contains("Negative: 1 (33.33%)"));
        let bob = text.find("bob:").expect("bob listed");
        let ann = text.find("ann:").expect("ann listed");
        assert!(bob < ann);
    }

    #[test]
    fn versions_table_marks_active() {
        let mut files = std::collections::BTreeMap::new();
        files.insert(
            "LR_Pipeline.json".to_string(),
            ArtifactFile {
                size: 10,
                modified: "2024-01-01T00:00:00Z".to_string(),
                path: "/tmp/LR_Pipeline.json".to_string(),
            },
        );
        let version = ModelVersion {
            id: 1,
            version_tag: "v1".to_string(),
            model_files: files,
            checksums: Default::default(),
            performance_metrics: None,
            created_at: "2024-03-05T10:20:30.000000+00:00".to_string(),
            deployed_at: None,
            is_active: true,
            description: "baseline".to_string(),
        };

        let table = render_versions(&[version]);
        let row = table.lines().nth(1).expect("row");
        assert!(row.starts_with("v1"));
        assert!(row.contains('*'));
        assert!(row.contains("2024-03-05 10:20:30"));
        assert!(row.ends_with("baseline"));
        assert_eq!(render_versions(&[]), "No model versions registered\n");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
