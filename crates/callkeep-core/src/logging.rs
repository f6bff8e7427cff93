//! Logging setup
//!
//! The engine logs through `tracing`; hosts that don't install their own
//! subscriber can call [`setup_logging`], optionally with a config read from
//! `CALLKEEP_LOG_LEVEL` and `CALLKEEP_LOG_JSON` by [`LoggingConfig::from_env`].

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ENV_PREFIX;
use crate::error::{CallError, CallResult};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Include file and line information
    pub file_info: bool,
    /// Log span open/close events
    pub log_spans: bool,
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            json: false,
            file_info: false,
            log_spans: false,
            app_name: "callkeep".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }

    /// Defaults overridden by `CALLKEEP_LOG_LEVEL` and `CALLKEEP_LOG_JSON`
    ///
    /// An unparseable level is an error rather than a silent fallback.
    pub fn from_env(app_name: impl Into<String>) -> CallResult<Self> {
        let mut config = LoggingConfig::new(Level::INFO, app_name);
        if let Ok(level) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            config.level = parse_log_level(&level)?;
        }
        if let Ok(json) = std::env::var(format!("{}_LOG_JSON", ENV_PREFIX)) {
            config.json = matches!(json.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(config)
    }
}

/// Install a global subscriber; fails if one is already installed
pub fn setup_logging(config: LoggingConfig) -> CallResult<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());

    let span_events = if config.log_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| CallError::config("logging", e.to_string()))?;

    tracing::info!("Starting {} v{}", config.app_name, crate::VERSION);
    Ok(())
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> CallResult<Level> {
    Level::from_str(level).map_err(|_| CallError::config("log_level", format!("Invalid log level: {}", level)))
}
