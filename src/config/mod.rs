//! Configuration management.
//!
//! Configuration is read from a TOML file and then overridden by
//! environment variables:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `FIREBULK_CONFIG_PATH` | Config file to load when `--config` is absent |
//! | `FIREBULK_DATA_DIR` | Root of the filesystem document store |

mod limits;

pub use limits::BatchLimits;

use crate::observability::{LogFormat, LoggingSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "FIREBULK_CONFIG_PATH";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "FIREBULK_DATA_DIR";

/// Main configuration for firebulk.
#[derive(Debug, Clone)]
pub struct FirebulkConfig {
    /// Root directory of the filesystem document store.
    pub data_dir: PathBuf,
    /// Batch and page limits of the target store.
    pub limits: BatchLimits,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl Default for FirebulkConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".firebulk"),
            limits: BatchLimits::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Limits section.
    pub limits: Option<ConfigFileLimits>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// `[limits]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLimits {
    /// Smallest accepted batch size.
    pub min_batch_size: Option<usize>,
    /// Largest accepted batch size.
    pub max_batch_size: Option<usize>,
    /// Batch size used when none is given.
    pub default_batch_size: Option<usize>,
    /// Page size for recursive deletes.
    pub delete_page_size: Option<usize>,
}

/// `[logging]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Default filter directive, e.g. `info` or `firebulk=debug`.
    pub level: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<String>,
}

impl FirebulkConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML, has unknown keys, or
    /// describes inconsistent limits.
    pub fn from_toml_str(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_config_file(file)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;
        Self::from_toml_str(&contents)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/firebulk/` on macOS)
    /// 2. XDG config dir (`~/.config/firebulk/`)
    ///
    /// Returns default configuration if no usable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("firebulk").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("firebulk")
                .join("config.toml"),
        ];
        for candidate in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Resolves configuration from an explicit path, the environment, or
    /// the default locations, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn resolve(explicit: Option<&Path>) -> crate::Result<Self> {
        let mut config = if let Some(path) = explicit {
            Self::load_from_file(path)?
        } else if let Some(path) = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
        {
            Self::load_from_file(Path::new(&path))?
        } else {
            Self::load_default()
        };

        if let Some(dir) = std::env::var(DATA_DIR_ENV)
            .ok()
            .filter(|d| !d.trim().is_empty())
        {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Converts a `ConfigFile` to `FirebulkConfig`.
    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(limits) = file.limits {
            if let Some(v) = limits.min_batch_size {
                config.limits.min_batch_size = v;
            }
            if let Some(v) = limits.max_batch_size {
                config.limits.max_batch_size = v;
            }
            if let Some(v) = limits.default_batch_size {
                config.limits.default_batch_size = v;
            }
            if let Some(v) = limits.delete_page_size {
                config.limits.delete_page_size = v;
            }
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format).ok_or_else(|| {
                    crate::Error::InvalidInput(format!("unknown log format '{format}'"))
                })?;
            }
            if logging.level.is_some() {
                config.logging.level = logging.level;
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config.limits.validate()?;
        Ok(config)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FirebulkConfig::default();
        assert_eq!(config.data_dir, PathBuf::from(".firebulk"));
        assert_eq!(config.limits.max_batch_size, 500);
        assert_eq!(config.limits.delete_page_size, 500);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_full_file() {
        let config = FirebulkConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/firebulk"

            [limits]
            max_batch_size = 100
            default_batch_size = 50
            delete_page_size = 20

            [logging]
            format = "json"
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/firebulk"));
        assert_eq!(config.limits.max_batch_size, 100);
        assert_eq!(config.limits.default_batch_size, 50);
        assert_eq!(config.limits.delete_page_size, 20);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_rejects_inconsistent_limits() {
        let result = FirebulkConfig::from_toml_str(
            r"
            [limits]
            max_batch_size = 100
            ",
        );
        // default_batch_size (500) no longer fits under the ceiling
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(FirebulkConfig::from_toml_str("batch = 3").is_err());
        assert!(FirebulkConfig::from_toml_str("[logging]\nformat = \"xml\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"store\"\n").unwrap();
        let config = FirebulkConfig::load_from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("store"));

        assert!(FirebulkConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
    }
}
