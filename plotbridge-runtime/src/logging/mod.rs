//! Logging infrastructure - structured tracing across the boundary layer
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log level, overridable through `RUST_LOG`
//! - Zero-cost when disabled
//! - One span per foreign call (`foreign_call`)
//! - Console output, JSON or human-readable, plus optional daily log files
//!
//! Targets:
//! - `plotbridge::refcount` - every increment, decrement and transfer (TRACE)
//! - `plotbridge::dispatch` - phase transitions of each call (DEBUG)
//! - `plotbridge::session` - runtime lifecycle (INFO)

use once_cell::sync::OnceCell;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

// Re-export tracing macros for use throughout the crate
pub use tracing::{debug, debug_span, error, info, trace, warn};

/// Global logging state; holds the file writer guard for the process lifetime
static LOGGER: OnceCell<Option<WorkerGuard>> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
    /// Directory for daily-rotated log files, in addition to stderr
    pub log_dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_spans: false,
            log_dir: None,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // PLOTBRIDGE_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level) = std::env::var("PLOTBRIDGE_LOG_LEVEL") {
            config.level = parse_level(&level).unwrap_or(Level::INFO);
        }

        config.json_format = std::env::var("PLOTBRIDGE_LOG_JSON").is_ok();
        config.show_spans = std::env::var("PLOTBRIDGE_LOG_SPANS").is_ok();

        if let Ok(dir) = std::env::var("PLOTBRIDGE_LOG_DIR") {
            config.log_dir = Some(dir);
        }

        config
    }

    /// Verbose config: every refcount operation, span events on
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            json_format: false,
            show_spans: true,
            log_dir: None,
        }
    }

    fn directives(&self) -> String {
        let level = self.level.as_str().to_lowercase();
        format!("plotbridge={level},plotbridge_runtime={level}")
    }
}

/// Parse a level name, case-insensitively
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration.
///
/// Only the first call installs a subscriber; later calls are no-ops.
pub fn init_with_config(config: LogConfig) {
    LOGGER.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directives()));

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let console = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_span_events(span_events)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(io::stderr)
                .with_span_events(span_events)
                .with_target(true)
                .with_line_number(cfg!(debug_assertions))
                .boxed()
        };

        let (file, guard) = match &config.log_dir {
            Some(dir) => {
                let appender = tracing_appender::rolling::daily(dir, "plotbridge.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        // Ignore error if a global subscriber was installed elsewhere
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console)
            .with(file)
            .try_init()
            .ok();

        guard
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.log_dir.is_none());

        let debug_config = LogConfig::debug();
        assert_eq!(debug_config.level, Level::TRACE);
        assert!(debug_config.show_spans);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_directives_cover_both_crates() {
        let config = LogConfig {
            level: Level::DEBUG,
            ..LogConfig::default()
        };
        assert_eq!(config.directives(), "plotbridge=debug,plotbridge_runtime=debug");
    }

    #[test]
    fn test_init_idempotent() {
        init_with_config(LogConfig::default());
        init_with_config(LogConfig::debug()); // Should not panic
        assert!(is_initialized());
    }
}
