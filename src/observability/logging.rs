//! Structured logging settings.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable carrying a filter directive (standard `RUST_LOG`).
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses `pretty` or `json` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging section of the config file, after parsing.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// Default filter directive.
    pub level: Option<String>,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from settings.
    ///
    /// `RUST_LOG` wins over the configured level; `verbose` raises the
    /// default to `debug`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let default_level = settings
            .and_then(|s| s.level.clone())
            .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string());
        let default_level = if verbose && default_level != "trace" {
            "debug".to_string()
        } else {
            default_level
        };

        let filter = std::env::var(LOG_FILTER_ENV)
            .ok()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .or_else(|| EnvFilter::try_new(&default_level).ok())
            .unwrap_or_else(|| EnvFilter::new("info"));

        Self {
            format: settings.map(|s| s.format).unwrap_or_default(),
            filter,
            file: settings.and_then(|s| s.file.clone()),
        }
    }
}
