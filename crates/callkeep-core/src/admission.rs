//! Admission controller
//!
//! Decides whether a new call request is accepted, and which existing calls
//! must be system-held to make room for it. Every function here is a pure
//! function of a [`RegistrySnapshot`] and the multi-call flag; the engine
//! applies the decision.
//!
//! | Request        | Rejected when                                              |
//! |----------------|------------------------------------------------------------|
//! | incoming       | another call is ringing; single-call mode and any other call is dialing, active or held |
//! | outgoing       | a call is ringing or active                                |
//! | direct active  | the id is already live                                     |
//!
//! A live id is always rejected as a duplicate before any other check.

use crate::registry::RegistrySnapshot;
use crate::session::CallId;

/// Why a request was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Conflicts with an existing incoming/active call under the policy
    Collision,
    /// Outgoing call not allowed in the current state
    Validation,
    /// Id already live
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    /// Human-readable, surfaced to the UI in the `CallRejected` event
    pub reason: String,
}

impl Rejection {
    fn new(kind: RejectionKind, reason: impl Into<String>) -> Self {
        Self { kind, reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Accept, system-holding the listed calls first
    Accept { hold: Vec<CallId> },
    Reject(Rejection),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accept { .. })
    }
}

fn duplicate(snapshot: &RegistrySnapshot, id: &str) -> Option<Admission> {
    snapshot.contains(id).then(|| {
        Admission::Reject(Rejection::new(
            RejectionKind::Duplicate,
            format!("call {} is already registered", id),
        ))
    })
}

/// Admission of an externally originated call
pub fn admit_incoming(snapshot: &RegistrySnapshot, id: &str, multi_call: bool) -> Admission {
    if let Some(rejected) = duplicate(snapshot, id) {
        return rejected;
    }

    if let Some(ringing) = snapshot.incoming.first() {
        return Admission::Reject(Rejection::new(
            RejectionKind::Collision,
            format!("an existing incoming call ({}) is already ringing", ringing),
        ));
    }

    if !multi_call {
        let existing = snapshot
            .active
            .first()
            .or_else(|| snapshot.held.first())
            .or_else(|| snapshot.dialing.first());
        if let Some(existing) = existing {
            return Admission::Reject(Rejection::new(
                RejectionKind::Collision,
                format!("an existing call ({}) is in progress", existing),
            ));
        }
        return Admission::Accept { hold: Vec::new() };
    }

    Admission::Accept { hold: snapshot.active.clone() }
}

/// Admission of a locally originated call
pub fn admit_outgoing(snapshot: &RegistrySnapshot, id: &str) -> Admission {
    if let Some(rejected) = duplicate(snapshot, id) {
        return rejected;
    }

    if let Some(ringing) = snapshot.incoming.first() {
        return Admission::Reject(Rejection::new(
            RejectionKind::Validation,
            format!("cannot start an outgoing call while incoming call {} is ringing", ringing),
        ));
    }
    if let Some(active) = snapshot.active.first() {
        return Admission::Reject(Rejection::new(
            RejectionKind::Validation,
            format!("cannot start an outgoing call while call {} is active", active),
        ));
    }

    Admission::Accept { hold: Vec::new() }
}

/// Admission of a pre-established call handed over already connected
pub fn admit_direct(snapshot: &RegistrySnapshot, id: &str, multi_call: bool) -> Admission {
    if let Some(rejected) = duplicate(snapshot, id) {
        return rejected;
    }

    let hold = if multi_call { Vec::new() } else { snapshot.active.clone() };
    Admission::Accept { hold }
}

/// Calls to system-hold when `id` becomes active through an answer
pub fn holds_for_answer(snapshot: &RegistrySnapshot, id: &str, multi_call: bool) -> Vec<CallId> {
    if multi_call {
        return Vec::new();
    }

    snapshot
        .active
        .iter()
        .chain(&snapshot.incoming)
        .filter(|other| other.as_str() != id)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<CallId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn reason_of(admission: &Admission) -> (RejectionKind, String) {
        match admission {
            Admission::Reject(r) => (r.kind, r.reason.clone()),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_second_incoming_always_collides() {
        let snapshot = RegistrySnapshot { incoming: ids(&["c1"]), ..Default::default() };

        for multi_call in [false, true] {
            let (kind, reason) = reason_of(&admit_incoming(&snapshot, "c2", multi_call));
            assert_eq!(kind, RejectionKind::Collision);
            assert!(reason.contains("c1"));
        }
    }

    #[test]
    fn test_incoming_during_outgoing_single_call() {
        let snapshot = RegistrySnapshot { dialing: ids(&["c1"]), ..Default::default() };

        let (kind, reason) = reason_of(&admit_incoming(&snapshot, "c2", false));
        assert_eq!(kind, RejectionKind::Collision);
        assert!(reason.contains("existing call"));

        assert_eq!(admit_incoming(&snapshot, "c2", true), Admission::Accept { hold: vec![] });
    }

    #[test]
    fn test_incoming_multi_call_holds_actives() {
        let snapshot = RegistrySnapshot {
            active: ids(&["a"]),
            held: ids(&["h"]),
            ..Default::default()
        };

        assert_eq!(admit_incoming(&snapshot, "c2", true), Admission::Accept { hold: ids(&["a"]) });
        assert!(!admit_incoming(&snapshot, "c2", false).is_accepted());
    }

    #[test]
    fn test_outgoing_blocked_by_ringing_or_active() {
        let ringing = RegistrySnapshot { incoming: ids(&["in"]), ..Default::default() };
        let active = RegistrySnapshot { active: ids(&["a"]), ..Default::default() };
        let held = RegistrySnapshot { held: ids(&["h"]), ..Default::default() };

        assert_eq!(reason_of(&admit_outgoing(&ringing, "out")).0, RejectionKind::Validation);
        assert_eq!(reason_of(&admit_outgoing(&active, "out")).0, RejectionKind::Validation);
        assert!(admit_outgoing(&held, "out").is_accepted());
    }

    #[test]
    fn test_duplicate_checked_first() {
        let snapshot = RegistrySnapshot { held: ids(&["c1"]), ..Default::default() };

        assert_eq!(reason_of(&admit_direct(&snapshot, "c1", false)).0, RejectionKind::Duplicate);
        assert_eq!(reason_of(&admit_outgoing(&snapshot, "c1")).0, RejectionKind::Duplicate);
        assert_eq!(reason_of(&admit_incoming(&snapshot, "c1", true)).0, RejectionKind::Duplicate);
    }

    #[test]
    fn test_direct_and_answer_holds() {
        let snapshot = RegistrySnapshot {
            incoming: ids(&["b"]),
            active: ids(&["a"]),
            ..Default::default()
        };

        assert_eq!(admit_direct(&snapshot, "d", false), Admission::Accept { hold: ids(&["a"]) });
        assert_eq!(admit_direct(&snapshot, "d", true), Admission::Accept { hold: vec![] });

        assert_eq!(holds_for_answer(&snapshot, "b", false), ids(&["a"]));
        assert!(holds_for_answer(&snapshot, "b", true).is_empty());
    }
}
