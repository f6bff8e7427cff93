//! Engine builder
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use callkeep_core::{AudioSubsystem, CallEngine, EngineConfig, TelephonyAdapter};
//! # fn example(adapter: Arc<dyn TelephonyAdapter>, audio: Arc<dyn AudioSubsystem>) -> callkeep_core::CallResult<()> {
//! let engine = CallEngine::builder()
//!     .config(EngineConfig::new().with_multi_call(true))
//!     .adapter(adapter)
//!     .audio(audio)
//!     .build()?;
//! assert!(engine.is_multi_call_enabled());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::adapter::TelephonyAdapter;
use crate::audio::{AudioRouteArbiter, AudioSubsystem};
use crate::config::EngineConfig;
use crate::engine::mirror;
use crate::engine::{CallEngine, EngineCore, EngineInner};
use crate::error::{CallError, CallResult};
use crate::events::EventChannel;
use crate::registry::CallRegistry;
use crate::schedule::DebouncedTasks;

#[derive(Default)]
pub struct CallEngineBuilder {
    config: EngineConfig,
    adapter: Option<Arc<dyn TelephonyAdapter>>,
    audio: Option<Arc<dyn AudioSubsystem>>,
    runtime: Option<Handle>,
}

impl CallEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn multi_call(mut self, enabled: bool) -> Self {
        self.config.multi_call_enabled = enabled;
        self
    }

    pub fn route_settle_delay(mut self, delay: Duration) -> Self {
        self.config.route_settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn adapter(mut self, adapter: Arc<dyn TelephonyAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn audio(mut self, audio: Arc<dyn AudioSubsystem>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Runtime for the adapter mirror worker and route timers
    ///
    /// Defaults to the runtime `build` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> CallResult<CallEngine> {
        self.config.validate()?;

        let adapter = self
            .adapter
            .ok_or_else(|| CallError::config("adapter", "a telephony adapter is required"))?;
        let audio = self
            .audio
            .ok_or_else(|| CallError::config("audio", "an audio subsystem is required"))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| CallError::NoRuntime)?,
        };

        let core = EngineCore {
            registry: CallRegistry::new(),
            arbiter: AudioRouteArbiter::new(),
            route_switches: DebouncedTasks::new(),
            multi_call: self.config.multi_call_enabled,
            total_rejected: 0,
        };

        tracing::info!(
            "Call engine created (multi-call: {}, route settle delay: {}ms, event buffer: {})",
            self.config.multi_call_enabled,
            self.config.route_settle_delay_ms,
            self.config.max_buffered_events
        );

        let (mirror_tx, mirror_rx) = mirror::channel();
        let inner = Arc::new(EngineInner {
            core: Mutex::new(core),
            channel: EventChannel::new(self.config.max_buffered_events),
            mirror_tx,
            audio,
            runtime,
            route_settle_delay: self.config.route_settle_delay(),
        });
        mirror::spawn_worker(&inner.runtime, adapter, Arc::downgrade(&inner), mirror_rx);

        Ok(CallEngine { inner })
    }
}
