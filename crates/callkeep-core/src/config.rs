//! Engine configuration
//!
//! [`EngineConfig`] can be built in code with the `with_*` methods, parsed from
//! TOML, or loaded from a file layered with `CALLKEEP_*` environment variables.
//!
//! ```rust
//! use callkeep_core::EngineConfig;
//!
//! let config = EngineConfig::new()
//!     .with_multi_call(true)
//!     .with_route_settle_delay_ms(500);
//! assert!(config.multi_call_enabled);
//!
//! let parsed = EngineConfig::from_toml_str("max_buffered_events = 64").unwrap();
//! assert_eq!(parsed.max_buffered_events, 64);
//! assert!(!parsed.multi_call_enabled);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::audio::DEFAULT_ROUTE_SETTLE_DELAY_MS;
use crate::error::{CallError, CallResult};

/// Default cap on events held while no listener is attached
pub const DEFAULT_MAX_BUFFERED_EVENTS: usize = 1024;

/// Environment variable prefix used by [`EngineConfig::load`]
pub const ENV_PREFIX: &str = "CALLKEEP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allow more than one connected call at a time
    pub multi_call_enabled: bool,
    /// Delay before switching to a newly connected Bluetooth/wired device
    pub route_settle_delay_ms: u64,
    /// Cap on events buffered while no listener is attached
    pub max_buffered_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            multi_call_enabled: false,
            route_settle_delay_ms: DEFAULT_ROUTE_SETTLE_DELAY_MS,
            max_buffered_events: DEFAULT_MAX_BUFFERED_EVENTS,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multi_call(mut self, enabled: bool) -> Self {
        self.multi_call_enabled = enabled;
        self
    }

    pub fn with_route_settle_delay_ms(mut self, delay_ms: u64) -> Self {
        self.route_settle_delay_ms = delay_ms;
        self
    }

    pub fn with_max_buffered_events(mut self, max: usize) -> Self {
        self.max_buffered_events = max;
        self
    }

    pub fn route_settle_delay(&self) -> Duration {
        Duration::from_millis(self.route_settle_delay_ms)
    }

    pub fn validate(&self) -> CallResult<()> {
        if self.max_buffered_events == 0 {
            return Err(CallError::config(
                "max_buffered_events",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(input: &str) -> CallResult<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| CallError::config("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, then apply `CALLKEEP_*` environment overrides
    ///
    /// `CALLKEEP_MULTI_CALL_ENABLED=true` overrides `multi_call_enabled`, and so
    /// on for every field. The file format is picked from its extension.
    pub fn load(path: impl AsRef<Path>) -> CallResult<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| CallError::config(path.display().to_string(), e.to_string()))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| CallError::config(path.display().to_string(), e.to_string()))?;
        config.validate()?;

        tracing::debug!("Loaded engine config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
