//! Call session engine
//!
//! [`CallEngine`] is the single entry point for the three producers that drive
//! call state: the app UI, the platform telephony stack (through
//! [`AdapterCallback`](crate::AdapterCallback)s) and audio hot-plug
//! notifications.
//!
//! # Architecture
//!
//! ```text
//!   UI calls      adapter callbacks      hot-plug
//!      │                 │                  │
//!      └────────────┬────┴──────────────────┘
//!                   ▼
//!        ┌─────────────────────┐   queue    ┌──────────────────┐
//!        │ Mutex<EngineCore>   │ ─────────▶ │ TelephonyAdapter │
//!        │  CallRegistry       │            └──────────────────┘
//!        │  AudioRouteArbiter  │   timer    ┌──────────────────┐
//!        │  DebouncedTasks     │ ─────────▶ │ route switch     │
//!        └──────────┬──────────┘            └──────────────────┘
//!                   │ emit (under the core lock)
//!                   ▼
//!        ┌─────────────────────┐
//!        │    EventChannel     │ ──▶ listener
//!        └─────────────────────┘
//! ```
//!
//! Every operation takes the core lock once, so each one is atomic with
//! respect to every other. Adapter mirroring goes through an ordered queue
//! drained by one worker task. Debounced route switches run as tokio tasks.
//! Both re-enter through the same lock. Events are published
//! while the core lock is held, so listeners see them in the order the state
//! changes happened.
//!
//! The operations themselves live in the submodules:
//!
//! - `calls` - creating, answering and ending calls
//! - `controls` - hold and mute
//! - `audio` - route selection and hot-plug
//! - `callbacks` - adapter callback dispatch
//! - `mirror` - ordered delivery to the telephony adapter

pub mod builder;

mod audio;
mod callbacks;
mod calls;
mod controls;
mod mirror;
#[cfg(test)]
mod testing;

pub use builder::CallEngineBuilder;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;

use crate::audio::{AudioRoute, AudioRouteArbiter, AudioSubsystem};
use crate::events::{Event, EventChannel, EventListener};
use crate::registry::CallRegistry;
use crate::schedule::DebouncedTasks;
use crate::session::{CallId, CallSession};

use self::mirror::{MirrorCommand, MirrorSender};

/// Who asked for a state change
///
/// Only UI-originated changes are mirrored to the adapter; the adapter
/// already knows about changes it reported itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Ui,
    Adapter,
}

impl Origin {
    fn mirrors(self) -> bool {
        self == Origin::Ui
    }
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub total_created: usize,
    pub total_ended: usize,
    /// Requests turned down by admission (collision or validation)
    pub total_rejected: usize,
    pub live_calls: usize,
}

/// State guarded by the engine lock
pub(crate) struct EngineCore {
    pub(crate) registry: CallRegistry,
    pub(crate) arbiter: AudioRouteArbiter,
    pub(crate) route_switches: DebouncedTasks<AudioRoute>,
    pub(crate) multi_call: bool,
    pub(crate) total_rejected: usize,
}

pub(crate) struct EngineInner {
    pub(crate) core: Mutex<EngineCore>,
    pub(crate) channel: EventChannel,
    pub(crate) mirror_tx: MirrorSender,
    pub(crate) audio: Arc<dyn AudioSubsystem>,
    pub(crate) runtime: Handle,
    pub(crate) route_settle_delay: Duration,
}

/// Handle to a call session engine
///
/// Cheap to clone; all clones drive the same engine.
#[derive(Clone)]
pub struct CallEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl std::fmt::Debug for CallEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("CallEngine")
            .field("live_calls", &core.registry.len())
            .field("current_call_id", &core.registry.current_call_id())
            .field("route", &core.arbiter.current_route())
            .field("multi_call", &core.multi_call)
            .finish()
    }
}

impl CallEngine {
    /// Start configuring a new engine
    pub fn builder() -> CallEngineBuilder {
        CallEngineBuilder::new()
    }

    // ===== Queries =====

    /// Every live session, oldest first
    pub fn get_active_calls(&self) -> Vec<CallSession> {
        let mut calls = self.inner.core.lock().registry.sessions();
        calls.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        calls
    }

    /// Snapshot of one live session
    pub fn get_call(&self, call_id: &str) -> Option<CallSession> {
        self.inner.core.lock().registry.get(call_id).cloned()
    }

    /// The call the UI is focused on, if any call is live
    pub fn get_current_call_id(&self) -> Option<CallId> {
        self.inner.core.lock().registry.current_call_id().cloned()
    }

    /// True while any session is live
    pub fn is_busy(&self) -> bool {
        !self.inner.core.lock().registry.is_empty()
    }

    /// Route the engine last applied; [`AudioRoute::Unknown`] after a failure
    pub fn audio_route(&self) -> AudioRoute {
        self.inner.core.lock().arbiter.current_route()
    }

    /// Whether more than one connected call is allowed
    pub fn is_multi_call_enabled(&self) -> bool {
        self.inner.core.lock().multi_call
    }

    /// Switch the admission policy; affects only requests made afterwards
    pub fn set_multi_call_mode(&self, enabled: bool) {
        let mut core = self.inner.core.lock();
        if core.multi_call != enabled {
            tracing::info!("Multi-call mode {}", if enabled { "enabled" } else { "disabled" });
        }
        core.multi_call = enabled;
    }

    /// Lifetime counters plus the number of live calls
    pub fn stats(&self) -> EngineStats {
        let core = self.inner.core.lock();
        EngineStats {
            total_created: core.registry.total_created(),
            total_ended: core.registry.total_ended(),
            total_rejected: core.total_rejected,
            live_calls: core.registry.len(),
        }
    }

    // ===== Listener =====

    /// Attach the event listener, replaying any buffered events to it first
    ///
    /// Returns the number of events replayed.
    pub fn attach_listener(&self, listener: Arc<dyn EventListener>) -> usize {
        // Holding the core lock keeps new events from slipping in between the
        // replay and the switch to pass-through.
        let _core = self.inner.core.lock();
        self.inner.channel.attach(listener)
    }

    /// Drop the listener and go back to buffering; returns whether one was attached
    pub fn detach_listener(&self) -> bool {
        self.inner.channel.detach()
    }

    /// End every call, cancel pending route switches and drop the listener
    ///
    /// The engine stays usable afterwards, but starts over from an empty
    /// event buffer.
    pub fn shutdown(&self) {
        {
            let mut core = self.inner.core.lock();
            let ended = self.end_all_locked(&mut core, Origin::Ui);
            core.route_switches.cancel_all();
            tracing::info!("Call engine shut down; ended {} calls", ended);
        }
        self.inner.channel.detach();
        self.inner.channel.clear();
    }

    // ===== Internal plumbing =====

    pub(crate) fn emit(&self, event: Event) {
        tracing::debug!("Publishing {} {:?}", event.event_type, event.payload);
        self.inner.channel.emit(event);
    }

    /// Queue a change for the telephony adapter
    pub(crate) fn mirror(&self, command: MirrorCommand) {
        if let Err(e) = self.inner.mirror_tx.send(command) {
            tracing::warn!("Adapter mirror queue is gone; dropping {:?}", e.0);
        }
    }

    pub(crate) fn mirror_hold(&self, call_id: &str, held: bool) {
        self.mirror(MirrorCommand::Hold { call_id: call_id.to_string(), held });
    }

    /// Rebuild a handle from a background task
    pub(crate) fn from_inner(inner: Arc<EngineInner>) -> Self {
        Self { inner }
    }
}
