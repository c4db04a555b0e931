//! Tracing subscriber setup shared by the TubeSense binaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tubesense_core::config::{LogFormat, LoggingConfig};

use crate::error::{WebError, WebResult};

/// Level directive for the configured level raised by `verbosity` (`-v` count).
pub fn level_directive(config: &LoggingConfig, verbosity: u8) -> &'static str {
    match verbosity {
        0 => config.level.as_directive(),
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` wins unless `-v` was given.
pub fn init_tracing(config: &LoggingConfig, verbosity: u8) -> WebResult<()> {
    let level = level_directive(config, verbosity);
    let filter = if verbosity == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
    };
    result.map_err(|e| WebError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubesense_core::config::LogLevel;

    #[test]
    fn verbosity_raises_level() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            format: LogFormat::Text,
        };
        assert_eq!(level_directive(&config, 0), "warn");
        assert_eq!(level_directive(&config, 1), "debug");
        assert_eq!(level_directive(&config, 4), "trace");
    }
}
