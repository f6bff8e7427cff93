//! Adapter callback dispatch
//!
//! Callbacks report changes the OS already made, so none of them is mirrored
//! back to the adapter.

use crate::adapter::AdapterCallback;
use crate::engine::{CallEngine, Origin};
use crate::error::{CallError, CallResult};
use crate::events::Event;
use crate::session::EndReason;

impl CallEngine {
    /// Apply a callback from the platform telephony stack
    ///
    /// `End` for an unknown call is a no-op; every other per-call callback
    /// returns [`CallError::NotFound`] for an unknown call.
    pub fn handle_adapter_callback(&self, callback: AdapterCallback) -> CallResult<()> {
        tracing::debug!("Adapter callback: {:?}", callback);

        match callback {
            AdapterCallback::Answer { call_id } => self.answer_from(&call_id, true, Origin::Adapter),
            AdapterCallback::End { call_id, reason } => {
                self.end_from(&call_id, reason.unwrap_or(EndReason::LocalEnded), Origin::Adapter);
                Ok(())
            }
            AdapterCallback::HoldChanged { call_id, held } => {
                let mut core = self.inner.core.lock();
                self.hold_locked(&mut core, &call_id, held, false, Origin::Adapter)
            }
            AdapterCallback::MuteChanged { call_id, muted } => {
                let mut core = self.inner.core.lock();
                self.mute_locked(&mut core, &call_id, muted, Origin::Adapter)
            }
            AdapterCallback::StartConfirmed { call_id } => {
                let core = self.inner.core.lock();
                if !core.registry.contains(&call_id) {
                    return Err(CallError::not_found(call_id));
                }
                tracing::info!("Telephony stack started call {}", call_id);
                self.emit(Event::call_started(&call_id));
                Ok(())
            }
            AdapterCallback::AudioSessionActivated => {
                let mut core = self.inner.core.lock();
                tracing::info!("Audio session activated");
                self.emit(Event::audio_session(true));

                if let Some(kind) = core.registry.current_call().map(|session| session.kind) {
                    self.apply_initial_route(&mut core, kind);
                }
                Ok(())
            }
            AdapterCallback::AudioSessionDeactivated => {
                let _core = self.inner.core.lock();
                tracing::info!("Audio session deactivated");
                self.emit(Event::audio_session(false));
                Ok(())
            }
            AdapterCallback::Dtmf { call_id, digits } => {
                let core = self.inner.core.lock();
                if !core.registry.contains(&call_id) {
                    return Err(CallError::not_found(call_id));
                }
                self.emit(Event::dtmf_received(&call_id, &digits));
                Ok(())
            }
        }
    }
}
