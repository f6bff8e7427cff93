//! In-call controls: hold and mute

use crate::engine::mirror::MirrorCommand;
use crate::engine::{CallEngine, EngineCore, Origin};
use crate::error::{CallError, CallResult};
use crate::events::Event;
use crate::registry::Transition;
use crate::session::CallState;

impl CallEngine {
    /// Put a call on hold or resume it
    ///
    /// Only `Active -> Held` and `Held -> Active` are honored; any other
    /// request is logged and ignored. `by_system` marks holds the app imposes
    /// on the user's behalf. Resuming a call in single-call mode holds every
    /// other active call first.
    ///
    /// A call put on hold while it was still ringing has never been answered
    /// and cannot be resumed this way; [`answer`](Self::answer) it instead.
    pub fn set_hold(&self, call_id: &str, held: bool, by_system: bool) -> CallResult<()> {
        let mut core = self.inner.core.lock();
        self.hold_locked(&mut core, call_id, held, by_system, Origin::Ui)
    }

    pub(crate) fn hold_locked(
        &self,
        core: &mut EngineCore,
        call_id: &str,
        held: bool,
        by_system: bool,
        origin: Origin,
    ) -> CallResult<()> {
        let state = core
            .registry
            .state_of(call_id)
            .ok_or_else(|| CallError::not_found(call_id))?;

        if !held && core.registry.is_parked_ringing(call_id) {
            tracing::warn!("Ignoring unhold request for call {}; it was never answered", call_id);
            return Ok(());
        }

        if !held && state == CallState::Held && !core.multi_call {
            for other in core.registry.ids_in_state(CallState::Active) {
                if other != call_id {
                    self.system_hold(core, &other);
                }
            }
        }

        let target = if held { CallState::Held } else { CallState::Active };
        match core.registry.transition(call_id, target)? {
            Transition::Applied { .. } => {
                if !held {
                    core.registry.set_current(call_id);
                }
                let Some(session) = core.registry.get_mut(call_id) else {
                    return Err(CallError::not_found(call_id));
                };
                if held {
                    session.held_by_system = by_system;
                }

                tracing::info!("Call {} {}", call_id, if held { "held" } else { "resumed" });
                self.emit(Event::call_hold_changed(session));
                if origin.mirrors() {
                    self.mirror_hold(call_id, held);
                }
            }
            Transition::Unchanged => {
                tracing::debug!("Call {} already {}", call_id, target);
            }
            Transition::Illegal { from } => {
                tracing::warn!("Ignoring {} request for call {} in state {}", if held { "hold" } else { "unhold" }, call_id, from);
            }
        }
        Ok(())
    }

    /// Mute or unmute the microphone for a call
    ///
    /// An event is published only when the hardware mute state actually
    /// changes; asking for the state the microphone is already in is silent.
    pub fn set_muted(&self, call_id: &str, muted: bool) -> CallResult<()> {
        let mut core = self.inner.core.lock();
        self.mute_locked(&mut core, call_id, muted, Origin::Ui)
    }

    pub(crate) fn mute_locked(&self, core: &mut EngineCore, call_id: &str, muted: bool, origin: Origin) -> CallResult<()> {
        let session = core
            .registry
            .get_mut(call_id)
            .ok_or_else(|| CallError::not_found(call_id))?;
        session.muted = muted;

        let audio = &self.inner.audio;
        if audio.is_microphone_muted() == muted {
            tracing::debug!("Microphone already {} for call {}", if muted { "muted" } else { "unmuted" }, call_id);
            return Ok(());
        }
        if let Err(e) = audio.set_microphone_muted(muted) {
            tracing::warn!("Failed to set microphone mute for call {}: {}", call_id, e);
            return Ok(());
        }

        tracing::info!("Call {} {}", call_id, if muted { "muted" } else { "unmuted" });
        self.emit(Event::call_mute_changed(call_id, muted));
        if origin.mirrors() {
            self.mirror(MirrorCommand::Mute { call_id: call_id.to_string(), muted });
        }
        Ok(())
    }
}
