//! CLI command definitions for TubeSense.
//!
//! Serving the web app, one-shot analyses, model version management and
//! model validation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Main CLI application.
#[derive(Parser, Debug)]
#[command(name = "tubesense", author, version, about, long_about = None)]
pub struct Cli {
    /// Logging verbosity
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "TUBESENSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web server
    Serve(ServeArgs),

    /// Analyze the comments of one video and print the result
    Analyze(AnalyzeArgs),

    /// Manage model versions
    Model(ModelArgs),

    /// Validate the deployed model
    Validate(ValidateArgs),
}

/// Web server arguments.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address, overrides the configuration
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port, overrides the configuration and PORT
    #[arg(long)]
    pub port: Option<u16>,
}

/// One-shot analysis arguments.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Video URL or bare 11-character video ID
    pub url: String,

    /// Maximum number of comments to fetch
    #[arg(long)]
    pub max_comments: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Model version management arguments.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: ModelCommand,
}

/// Model version subcommands.
#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    /// Snapshot the current artifacts as a new version
    Create {
        /// Version tag
        #[arg(long = "version", value_name = "TAG")]
        tag: String,

        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Mark a version as active
    Deploy {
        /// Version tag
        #[arg(long = "version", value_name = "TAG")]
        tag: String,
    },

    /// Restore a version's artifacts and mark it active
    Rollback {
        /// Version tag
        #[arg(long = "version", value_name = "TAG")]
        tag: String,
    },

    /// List registered versions, newest first
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the active version
    Current,

    /// Check a version's checksums against the artifact directory
    Validate {
        /// Version tag
        #[arg(long = "version", value_name = "TAG")]
        tag: String,
    },

    /// Delete old inactive versions and their backups
    Cleanup {
        /// Number of inactive versions to keep
        #[arg(long, default_value_t = 5)]
        keep: usize,
    },

    /// Train a pipeline artifact from labelled JSON lines
    Train {
        /// Training data, one {"text": ..., "label": 0|1} object per line
        #[arg(long)]
        data: PathBuf,

        /// Output artifact path, defaults to the configured pipeline path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Gradient descent passes
        #[arg(long)]
        epochs: Option<usize>,
    },
}

/// Validation arguments.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: ValidateCommand,
}

/// Validation subcommands.
#[derive(Subcommand, Debug)]
pub enum ValidateCommand {
    /// Check artifact files, loading, predictions and latency
    Models {
        /// Report output path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Benchmark accuracy, latency, throughput and memory
    Performance {
        /// Store the report on this model version
        #[arg(long, value_name = "TAG")]
        record_version: Option<String>,

        /// Report output path
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("tubesense").chain(args.iter().copied()))
    }

    #[test]
    fn model_create_takes_version_and_description() {
        let cli = parse(&["model", "create", "--version", "v1.0", "--description", "first"])
            .expect("parse");
        match cli.command {
            Commands::Model(ModelArgs {
                command: ModelCommand::Create { tag, description },
            }) => {
                assert_eq!(tag, "v1.0");
                assert_eq!(description, "first");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn missing_version_is_a_usage_error() {
        let err = parse(&["model", "deploy"]).expect_err("should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn cleanup_keeps_five_by_default() {
        let cli = parse(&["model", "cleanup"]).expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Model(ModelArgs {
                command: ModelCommand::Cleanup { keep: 5 }
            })
        ));
    }

    #[test]
    fn verbosity_counts_flags() {
        let cli = parse(&["-vv", "validate", "models"]).expect("parse");
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn analyze_accepts_json_format() {
        let cli = parse(&["analyze", "dQw4w9WgXcQ", "--format", "json", "--max-comments", "20"])
            .expect("parse");
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.max_comments, Some(20));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
