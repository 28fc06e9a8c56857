//! `plotbridge.toml` configuration
//!
//! ```toml
//! [session]
//! backend = "Agg"
//! initialize_runtime = true
//!
//! [log]
//! level = "debug"
//! json = false
//! spans = true
//! dir = "logs"
//! ```

use plotbridge_runtime::logging::{parse_level, LogConfig};
use plotbridge_runtime::SessionOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

/// File name looked up by [`Config::discover`]
pub const CONFIG_FILE: &str = "plotbridge.toml";

/// Environment variable overriding `session.backend`
pub const BACKEND_ENV: &str = "PLOTBRIDGE_BACKEND";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: Option<String>,

    #[serde(default = "default_true")]
    pub initialize_runtime: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSection {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub spans: bool,

    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: None,
            initialize_runtime: true,
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            spans: false,
            dir: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Find `plotbridge.toml` in `start` or its parents; defaults when none
    /// is found. A file that exists but does not parse is an error.
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        let mut current = Some(start);
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                tracing::debug!(target: "plotbridge::config", path = %candidate.display(), "loading config");
                return Self::from_file(&candidate);
            }
            current = dir.parent();
        }
        Ok(Self::default())
    }

    /// Apply `PLOTBRIDGE_BACKEND`, if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(backend) = std::env::var(BACKEND_ENV) {
            self.session.backend = Some(backend).filter(|backend| !backend.is_empty());
        }
        self
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            backend: self.session.backend.clone(),
            initialize_runtime: self.session.initialize_runtime,
        }
    }

    /// Unknown level names fall back to `info`
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: parse_level(&self.log.level).unwrap_or(Level::INFO),
            json_format: self.log.json,
            show_spans: self.log.spans,
            log_dir: self.log.dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.session_options().initialize_runtime);
        assert_eq!(config.log_config().level, Level::INFO);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [session]
            backend = "Agg"

            [log]
            level = "TRACE"
            spans = true
            "#,
        )
        .unwrap();

        let options = config.session_options();
        assert_eq!(options.backend.as_deref(), Some("Agg"));
        assert!(options.initialize_runtime);

        let log = config.log_config();
        assert_eq!(log.level, Level::TRACE);
        assert!(log.show_spans);
        assert!(!log.json_format);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::parse("[session\nbackend = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        assert!(Config::parse("[session]\ninitialize_runtime = \"yes\"").is_err());
    }

    #[test]
    fn test_unknown_level_falls_back() {
        let config = Config::parse("[log]\nlevel = \"chatty\"").unwrap();
        assert_eq!(config.log_config().level, Level::INFO);
    }

    #[test]
    fn test_discover_walks_up() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(CONFIG_FILE), "[session]\nbackend = \"svg\"\n").unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::discover(&nested).unwrap();
        assert_eq!(config.session.backend.as_deref(), Some("svg"));
    }

    #[test]
    fn test_discover_without_file() {
        let root = tempfile::tempdir().unwrap();
        let config = Config::discover(root.path()).unwrap();
        assert_eq!(config.session.backend, None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let err = Config::from_file(&root.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }
}
