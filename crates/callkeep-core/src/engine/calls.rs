//! Call lifecycle operations
//!
//! Creating, answering and ending calls, plus the small per-call edits
//! (display name, ringer silencing).
//!
//! Every create operation runs the admission controller against a snapshot of
//! the registry taken under the engine lock, applies any system holds the
//! decision asks for, and only then inserts the new session. A rejected
//! request leaves the registry untouched.

use crate::admission::{self, Admission, Rejection, RejectionKind};
use crate::engine::mirror::MirrorCommand;
use crate::engine::{CallEngine, EngineCore, Origin};
use crate::error::{CallError, CallResult};
use crate::events::Event;
use crate::registry::Transition;
use crate::session::{CallDirection, CallKind, CallSession, CallState, EndReason};

impl CallEngine {
    /// Report a call arriving from the network
    ///
    /// Fails with [`CallError::Collision`] when another call is ringing, or in
    /// single-call mode when any other call is in progress; the rejection is
    /// also published as `CallRejected`. In multi-call mode every `Active`
    /// call is put on hold first.
    pub fn report_incoming(
        &self,
        call_id: impl Into<String>,
        kind: CallKind,
        display_name: impl Into<String>,
        picture_url: Option<String>,
        metadata: Option<String>,
    ) -> CallResult<()> {
        let call_id = call_id.into();
        let mut core = self.inner.core.lock();

        let snapshot = core.registry.snapshot();
        let hold = match admission::admit_incoming(&snapshot, &call_id, core.multi_call) {
            Admission::Accept { hold } => hold,
            Admission::Reject(rejection) => return Err(self.reject(&mut core, &call_id, rejection)),
        };
        for other in &hold {
            self.system_hold(&mut core, other);
        }

        let session = CallSession::new(
            call_id.as_str(),
            kind,
            CallDirection::Incoming,
            display_name,
            picture_url,
            CallState::Incoming,
            metadata,
        );
        let serial = core.registry.insert(session.clone())?;
        core.registry.set_current(&call_id);
        tracing::info!("Incoming {} call {} from {}", kind, call_id, session.display_name);

        self.mirror(MirrorCommand::Register { session, serial });
        Ok(())
    }

    /// Place a call from this device
    ///
    /// Fails with [`CallError::Validation`] while a call is ringing or active.
    pub fn start_outgoing(
        &self,
        call_id: impl Into<String>,
        kind: CallKind,
        target_name: impl Into<String>,
        metadata: Option<String>,
    ) -> CallResult<()> {
        let call_id = call_id.into();
        let mut core = self.inner.core.lock();

        let snapshot = core.registry.snapshot();
        if let Admission::Reject(rejection) = admission::admit_outgoing(&snapshot, &call_id) {
            return Err(self.reject(&mut core, &call_id, rejection));
        }

        let session = CallSession::new(
            call_id.as_str(),
            kind,
            CallDirection::Outgoing,
            target_name,
            None,
            CallState::Dialing,
            metadata,
        );
        let serial = core.registry.insert(session.clone())?;
        core.registry.set_current(&call_id);
        tracing::info!("Dialing {} call {} to {}", kind, call_id, session.display_name);

        self.mirror(MirrorCommand::Register { session, serial });
        self.apply_initial_route(&mut core, kind);
        Ok(())
    }

    /// Register a call that is already connected, such as one handed over
    /// from another device
    ///
    /// In single-call mode any `Active` call is put on hold.
    pub fn start_direct(
        &self,
        call_id: impl Into<String>,
        kind: CallKind,
        target_name: impl Into<String>,
        metadata: Option<String>,
    ) -> CallResult<()> {
        let call_id = call_id.into();
        let mut core = self.inner.core.lock();

        let snapshot = core.registry.snapshot();
        let hold = match admission::admit_direct(&snapshot, &call_id, core.multi_call) {
            Admission::Accept { hold } => hold,
            Admission::Reject(rejection) => return Err(self.reject(&mut core, &call_id, rejection)),
        };
        for other in &hold {
            self.system_hold(&mut core, other);
        }

        let session = CallSession::new(
            call_id.as_str(),
            kind,
            CallDirection::Outgoing,
            target_name,
            None,
            CallState::Active,
            metadata,
        );
        let serial = core.registry.insert(session.clone())?;
        core.registry.set_current(&call_id);
        tracing::info!("Direct {} call {} with {} is active", kind, call_id, session.display_name);

        self.mirror(MirrorCommand::Register { session, serial });
        self.apply_initial_route(&mut core, kind);
        Ok(())
    }

    /// Connect a ringing, dialing or held call
    ///
    /// `is_local` distinguishes the user answering on this device
    /// (`CallAnswered`) from the remote party picking up (`OutgoingCallAnswered`).
    pub fn answer(&self, call_id: &str, is_local: bool) -> CallResult<()> {
        self.answer_from(call_id, is_local, Origin::Ui)
    }

    pub(crate) fn answer_from(&self, call_id: &str, is_local: bool, origin: Origin) -> CallResult<()> {
        let mut core = self.inner.core.lock();

        let state = core
            .registry
            .state_of(call_id)
            .ok_or_else(|| CallError::not_found(call_id))?;
        if state == CallState::Active {
            tracing::debug!("Call {} is already active", call_id);
            return Ok(());
        }

        let snapshot = core.registry.snapshot();
        for other in admission::holds_for_answer(&snapshot, call_id, core.multi_call) {
            self.system_hold(&mut core, &other);
        }

        match core.registry.transition(call_id, CallState::Active)? {
            Transition::Applied { from } => {
                core.registry.set_current(call_id);
                let Some(session) = core.registry.get(call_id) else {
                    return Err(CallError::not_found(call_id));
                };
                let kind = session.kind;
                tracing::info!("Call {} answered ({} -> Active, local: {})", call_id, from, is_local);
                self.emit(Event::call_answered(session, is_local));

                if from == CallState::Held && origin.mirrors() {
                    self.mirror_hold(call_id, false);
                }
                self.apply_initial_route(&mut core, kind);
            }
            Transition::Unchanged => {}
            Transition::Illegal { from } => {
                tracing::warn!("Ignoring answer for call {} in state {}", call_id, from);
            }
        }
        Ok(())
    }

    /// End a call as hung up on this device
    ///
    /// Ending an unknown or already ended call is a no-op. Returns whether a
    /// call was ended.
    pub fn end(&self, call_id: &str) -> bool {
        self.end_with_reason(call_id, EndReason::LocalEnded)
    }

    /// End a call, reporting `reason` in `CallEnded`
    pub fn end_with_reason(&self, call_id: &str, reason: EndReason) -> bool {
        self.end_from(call_id, reason, Origin::Ui)
    }

    pub(crate) fn end_from(&self, call_id: &str, reason: EndReason, origin: Origin) -> bool {
        let mut core = self.inner.core.lock();
        let ended = self.end_locked(&mut core, call_id, reason, origin);
        if ended && core.registry.is_empty() {
            self.on_last_call_ended(&mut core);
        }
        ended
    }

    /// End every live call; returns how many were ended
    pub fn end_all(&self) -> usize {
        let mut core = self.inner.core.lock();
        self.end_all_locked(&mut core, Origin::Ui)
    }

    pub(crate) fn end_all_locked(&self, core: &mut EngineCore, origin: Origin) -> usize {
        let mut ended = 0;
        for id in core.registry.ids() {
            if self.end_locked(core, &id, EndReason::LocalEnded, origin) {
                ended += 1;
            }
        }
        core.registry.clear();
        self.on_last_call_ended(core);
        ended
    }

    fn end_locked(&self, core: &mut EngineCore, call_id: &str, reason: EndReason, origin: Origin) -> bool {
        let Some(session) = core.registry.remove(call_id) else {
            tracing::debug!("End for unknown call {} ignored", call_id);
            return false;
        };

        tracing::info!("Call {} ended ({})", call_id, reason);
        self.emit(Event::call_ended(&session, reason));

        if origin.mirrors() {
            self.mirror(MirrorCommand::End { call_id: call_id.to_string() });
        }
        true
    }

    /// Change the label shown for a call
    pub fn update_display(&self, call_id: &str, display_name: impl Into<String>) -> CallResult<()> {
        let display_name = display_name.into();
        let mut core = self.inner.core.lock();

        let session = core
            .registry
            .get_mut(call_id)
            .ok_or_else(|| CallError::not_found(call_id))?;
        session.display_name = display_name.clone();

        tracing::debug!("Call {} display name updated", call_id);
        self.emit(Event::call_display_updated(call_id, &display_name));

        self.mirror(MirrorCommand::Display { call_id: call_id.to_string(), display_name });
        Ok(())
    }

    /// Silence the ringer of a ringing call
    ///
    /// Only meaningful while the call is `Incoming`; other states are ignored.
    pub fn set_silenced(&self, call_id: &str, silenced: bool) -> CallResult<()> {
        let mut core = self.inner.core.lock();

        let session = core
            .registry
            .get_mut(call_id)
            .ok_or_else(|| CallError::not_found(call_id))?;
        if session.state != CallState::Incoming {
            tracing::warn!("Ignoring silence request for call {} in state {}", call_id, session.state);
            return Ok(());
        }

        session.manually_silenced = silenced;
        tracing::debug!("Call {} ringer silenced: {}", call_id, silenced);
        Ok(())
    }

    // ===== Helpers =====

    /// Turn an admission rejection into an error, publishing `CallRejected`
    /// for policy rejections
    fn reject(&self, core: &mut EngineCore, call_id: &str, rejection: Rejection) -> CallError {
        match rejection.kind {
            RejectionKind::Duplicate => {
                tracing::warn!("Rejected call {}: {}", call_id, rejection.reason);
                CallError::duplicate(call_id)
            }
            RejectionKind::Collision | RejectionKind::Validation => {
                core.total_rejected += 1;
                tracing::warn!("Rejected call {}: {}", call_id, rejection.reason);
                self.emit(Event::call_rejected(call_id, &rejection.reason));

                if rejection.kind == RejectionKind::Collision {
                    CallError::collision(call_id, rejection.reason)
                } else {
                    CallError::validation(call_id, rejection.reason)
                }
            }
        }
    }

    /// Put another call on hold to make room, publishing and mirroring the hold
    pub(crate) fn system_hold(&self, core: &mut EngineCore, call_id: &str) {
        if core.registry.force_system_hold(call_id).is_none() {
            return;
        }
        if let Some(session) = core.registry.get(call_id) {
            self.emit(Event::call_hold_changed(session));
        }
        self.mirror_hold(call_id, true);
    }

    /// End the session the OS refused to register, with
    /// [`EndReason::Failed`] and without mirroring the end back
    ///
    /// A session that has since ended, or been replaced by a new call with the
    /// same id, is left alone.
    pub(crate) fn end_failed_registration(&self, call_id: &str, serial: u64) -> bool {
        let mut core = self.inner.core.lock();
        if core.registry.serial_of(call_id) != Some(serial) {
            tracing::debug!("Refused registration of call {} no longer applies", call_id);
            return false;
        }

        let ended = self.end_locked(&mut core, call_id, EndReason::Failed, Origin::Adapter);
        if ended && core.registry.is_empty() {
            self.on_last_call_ended(&mut core);
        }
        ended
    }

    /// Reset routing state once no call is left
    fn on_last_call_ended(&self, core: &mut EngineCore) {
        let canceled = core.route_switches.cancel_all();
        if canceled > 0 {
            tracing::debug!("Canceled {} pending route switches", canceled);
        }
        core.arbiter.clear_pin();
    }
}
