//! Call registry
//!
//! Owns the set of live [`CallSession`]s keyed by call id, plus the
//! `current_call_id` pointer. The registry is not synchronized on its own: the
//! engine owns exactly one instance behind its lock, so multi-entry invariants
//! (such as "at most one Incoming") are checked and updated atomically.

use std::collections::HashMap;

use crate::error::{CallError, CallResult};
use crate::session::{CallId, CallSession, CallState};

/// Outcome of a requested state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The session moved from `from` to the requested state
    Applied { from: CallState },
    /// The session is already in the requested state
    Unchanged,
    /// The state machine does not allow the move; nothing changed
    Illegal { from: CallState },
}

/// Point-in-time view used by admission decisions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub incoming: Vec<CallId>,
    pub dialing: Vec<CallId>,
    pub active: Vec<CallId>,
    pub held: Vec<CallId>,
}

impl RegistrySnapshot {
    pub fn contains(&self, id: &str) -> bool {
        self.incoming
            .iter()
            .chain(&self.dialing)
            .chain(&self.active)
            .chain(&self.held)
            .any(|existing| existing == id)
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.dialing.is_empty() && self.active.is_empty() && self.held.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RegistryStats {
    total_created: usize,
    total_ended: usize,
}

/// Bookkeeping kept alongside each live session
#[derive(Debug, Clone, Copy)]
struct Tracking {
    /// Distinguishes this session from an earlier one with the same id
    serial: u64,
    /// Parked by a system hold before it was ever answered
    parked_ringing: bool,
}

#[derive(Debug, Default)]
pub struct CallRegistry {
    sessions: HashMap<CallId, CallSession>,
    tracking: HashMap<CallId, Tracking>,
    current_call_id: Option<CallId>,
    stats: RegistryStats,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created session
    ///
    /// Returns the session's serial, unique for the registry's lifetime even
    /// when a call id is reused.
    pub fn insert(&mut self, session: CallSession) -> CallResult<u64> {
        if self.sessions.contains_key(&session.id) {
            return Err(CallError::duplicate(&session.id));
        }

        self.stats.total_created += 1;
        let serial = self.stats.total_created as u64;
        tracing::debug!("Registered call {} in state {} (serial {})", session.id, session.state, serial);
        self.tracking
            .insert(session.id.clone(), Tracking { serial, parked_ringing: false });
        self.sessions.insert(session.id.clone(), session);
        Ok(serial)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CallSession> {
        self.sessions.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut CallSession> {
        self.sessions.get_mut(id)
    }

    pub fn state_of(&self, id: &str) -> Option<CallState> {
        self.sessions.get(id).map(|s| s.state)
    }

    /// Serial handed out when the live session `id` was inserted
    pub fn serial_of(&self, id: &str) -> Option<u64> {
        self.tracking.get(id).map(|t| t.serial)
    }

    /// Whether `id` is on hold because another call was answered while it
    /// was still ringing
    pub fn is_parked_ringing(&self, id: &str) -> bool {
        self.tracking.get(id).is_some_and(|t| t.parked_ringing)
    }

    /// Move a session through the state machine
    ///
    /// `Ended` is not accepted here; ending goes through [`remove`](Self::remove)
    /// so that a session can never be observed in the terminal state.
    pub fn transition(&mut self, id: &str, next: CallState) -> CallResult<Transition> {
        let session = self.sessions.get_mut(id).ok_or_else(|| CallError::not_found(id))?;
        let from = session.state;

        if from == next {
            return Ok(Transition::Unchanged);
        }
        if next.is_terminal() || !from.can_transition_to(next) {
            return Ok(Transition::Illegal { from });
        }

        session.state = next;
        if next == CallState::Active {
            session.held_by_system = false;
            session.manually_silenced = false;
            if let Some(tracking) = self.tracking.get_mut(id) {
                tracking.parked_ringing = false;
            }
        }
        tracing::debug!("Call {} transitioned {} -> {}", id, from, next);
        Ok(Transition::Applied { from })
    }

    /// Put a session on hold on the engine's own behalf
    ///
    /// Besides `Active`, a still-ringing `Incoming` session may be parked this
    /// way when another call is answered in single-call mode.
    pub fn force_system_hold(&mut self, id: &str) -> Option<CallState> {
        let session = self.sessions.get_mut(id)?;
        match session.state {
            CallState::Active | CallState::Incoming => {
                let from = session.state;
                session.state = CallState::Held;
                session.held_by_system = true;
                if from == CallState::Incoming {
                    if let Some(tracking) = self.tracking.get_mut(id) {
                        tracking.parked_ringing = true;
                    }
                }
                tracing::debug!("Call {} system-held (was {})", id, from);
                Some(from)
            }
            _ => None,
        }
    }

    /// Remove a session, reassigning `current_call_id` if it pointed at it
    pub fn remove(&mut self, id: &str) -> Option<CallSession> {
        let mut session = self.sessions.remove(id)?;
        self.tracking.remove(id);
        session.state = CallState::Ended;
        self.stats.total_ended += 1;

        if self.current_call_id.as_deref() == Some(id) {
            self.current_call_id = self.sessions.keys().next().cloned();
        }

        tracing::debug!(
            "Unregistered call {}; current call is now {:?}",
            id,
            self.current_call_id
        );
        Some(session)
    }

    /// Drop every session and the current pointer
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.tracking.clear();
        self.current_call_id = None;
    }

    pub fn current_call_id(&self) -> Option<&CallId> {
        self.current_call_id.as_ref()
    }

    pub fn current_call(&self) -> Option<&CallSession> {
        self.current_call_id.as_deref().and_then(|id| self.sessions.get(id))
    }

    /// Point `current_call_id` at a live session; unknown ids are ignored
    pub fn set_current(&mut self, id: &str) {
        if self.sessions.contains_key(id) {
            self.current_call_id = Some(id.to_string());
        }
    }

    pub fn ids(&self) -> Vec<CallId> {
        self.sessions.keys().cloned().collect()
    }

    pub fn ids_in_state(&self, state: CallState) -> Vec<CallId> {
        self.sessions
            .values()
            .filter(|s| s.state == state)
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn sessions(&self) -> Vec<CallSession> {
        self.sessions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut snapshot = RegistrySnapshot::default();
        for session in self.sessions.values() {
            let bucket = match session.state {
                CallState::Incoming => &mut snapshot.incoming,
                CallState::Dialing => &mut snapshot.dialing,
                CallState::Active => &mut snapshot.active,
                CallState::Held => &mut snapshot.held,
                CallState::Ended => continue,
            };
            bucket.push(session.id.clone());
        }
        snapshot
    }

    pub fn total_created(&self) -> usize {
        self.stats.total_created
    }

    pub fn total_ended(&self) -> usize {
        self.stats.total_ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CallDirection, CallKind};

    fn session(id: &str, state: CallState) -> CallSession {
        CallSession::new(id, CallKind::Audio, CallDirection::Incoming, "Alice", None, state, None)
    }

    #[test]
    fn test_insert_rejects_live_duplicate() {
        let mut registry = CallRegistry::new();
        registry.insert(session("c1", CallState::Incoming)).unwrap();

        let err = registry.insert(session("c1", CallState::Dialing)).unwrap_err();
        assert_eq!(err, CallError::duplicate("c1"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.total_created(), 1);
    }

    #[test]
    fn test_transition_outcomes() {
        let mut registry = CallRegistry::new();
        registry.insert(session("c1", CallState::Incoming)).unwrap();

        assert_eq!(
            registry.transition("c1", CallState::Held).unwrap(),
            Transition::Illegal { from: CallState::Incoming }
        );
        assert_eq!(
            registry.transition("c1", CallState::Active).unwrap(),
            Transition::Applied { from: CallState::Incoming }
        );
        assert_eq!(registry.transition("c1", CallState::Active).unwrap(), Transition::Unchanged);
        assert_eq!(
            registry.transition("c1", CallState::Ended).unwrap(),
            Transition::Illegal { from: CallState::Active }
        );
        assert!(matches!(
            registry.transition("missing", CallState::Active),
            Err(CallError::NotFound { .. })
        ));
    }

    #[test]
    fn test_system_hold_marks_flag_and_resume_clears_it() {
        let mut registry = CallRegistry::new();
        registry.insert(session("c1", CallState::Active)).unwrap();
        registry.insert(session("c2", CallState::Dialing)).unwrap();

        assert_eq!(registry.force_system_hold("c1"), Some(CallState::Active));
        assert!(registry.get("c1").unwrap().held_by_system);
        assert_eq!(registry.force_system_hold("c2"), None);

        registry.transition("c1", CallState::Active).unwrap();
        assert!(!registry.get("c1").unwrap().held_by_system);
    }

    #[test]
    fn test_ringing_call_parked_by_system_hold() {
        let mut registry = CallRegistry::new();
        registry.insert(session("c1", CallState::Incoming)).unwrap();

        assert_eq!(registry.force_system_hold("c1"), Some(CallState::Incoming));
        assert_eq!(registry.state_of("c1"), Some(CallState::Held));
        assert!(registry.get("c1").unwrap().held_by_system);
        assert!(registry.is_parked_ringing("c1"));

        registry.transition("c1", CallState::Active).unwrap();
        assert!(!registry.is_parked_ringing("c1"));
    }

    #[test]
    fn test_reused_id_gets_a_new_serial() {
        let mut registry = CallRegistry::new();
        let first = registry.insert(session("c1", CallState::Incoming)).unwrap();
        registry.remove("c1");
        assert_eq!(registry.serial_of("c1"), None);

        let second = registry.insert(session("c1", CallState::Incoming)).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.serial_of("c1"), Some(second));
    }

    #[test]
    fn test_remove_reassigns_current_call() {
        let mut registry = CallRegistry::new();
        registry.insert(session("c1", CallState::Active)).unwrap();
        registry.insert(session("c2", CallState::Held)).unwrap();
        registry.set_current("c1");

        let removed = registry.remove("c1").unwrap();
        assert_eq!(removed.state, CallState::Ended);
        assert_eq!(registry.current_call_id().map(String::as_str), Some("c2"));

        registry.remove("c2");
        assert_eq!(registry.current_call_id(), None);
        assert!(registry.remove("c2").is_none());
        assert_eq!(registry.total_ended(), 2);
    }

    #[test]
    fn test_snapshot_buckets_by_state() {
        let mut registry = CallRegistry::new();
        registry.insert(session("a", CallState::Incoming)).unwrap();
        registry.insert(session("b", CallState::Dialing)).unwrap();
        registry.insert(session("c", CallState::Held)).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.incoming, vec!["a".to_string()]);
        assert_eq!(snapshot.dialing, vec!["b".to_string()]);
        assert!(snapshot.active.is_empty());
        assert!(snapshot.contains("c"));
        assert!(!snapshot.contains("d"));
    }
}
