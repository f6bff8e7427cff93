//! Call session types
//!
//! A [`CallSession`] is one tracked call. Sessions are created and mutated only
//! by the engine; callers receive cloned snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a call, supplied by the caller
pub type CallId = String;

/// Media kind of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Audio,
    Video,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Audio => write!(f, "Audio"),
            CallKind::Video => write!(f, "Video"),
        }
    }
}

/// Direction of a call from the device's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallDirection {
    /// Originated externally and reported to the engine
    Incoming,
    /// Originated locally, including pre-established calls handed to the engine
    Outgoing,
}

/// Lifecycle state of a call
///
/// ```text
/// Incoming ──▶ Active ◀──▶ Held
///    │           ▲  │        │
///    │  Dialing ─┘  │        │
///    ▼     │        ▼        ▼
///  Ended ◀─┴─────── Ended ◀──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// Ringing, waiting for the user to answer
    Incoming,
    /// Outgoing call placed, waiting for the remote party
    Dialing,
    /// Connected
    Active,
    /// Connected but on hold
    Held,
    /// Terminal; the session is removed from the registry
    Ended,
}

impl CallState {
    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: CallState) -> bool {
        use CallState::*;
        matches!(
            (self, next),
            (Incoming, Active)
                | (Incoming, Ended)
                | (Dialing, Active)
                | (Dialing, Ended)
                | (Active, Held)
                | (Active, Ended)
                | (Held, Active)
                | (Held, Ended)
        )
    }

    /// Connected states, either talking or on hold
    pub fn is_connected(&self) -> bool {
        matches!(self, CallState::Active | CallState::Held)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Incoming => "Incoming",
            CallState::Dialing => "Dialing",
            CallState::Active => "Active",
            CallState::Held => "Held",
            CallState::Ended => "Ended",
        };
        f.write_str(name)
    }
}

/// Why a call ended, carried in the `CallEnded` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// Hung up on this device
    LocalEnded,
    /// The OS refused to register the call, or setup otherwise failed
    Failed,
    RemoteEnded,
    Unanswered,
    AnsweredElsewhere,
    DeclinedElsewhere,
    Missed,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::LocalEnded => "localEnded",
            EndReason::Failed => "failed",
            EndReason::RemoteEnded => "remoteEnded",
            EndReason::Unanswered => "unanswered",
            EndReason::AnsweredElsewhere => "answeredElsewhere",
            EndReason::DeclinedElsewhere => "declinedElsewhere",
            EndReason::Missed => "missed",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub id: CallId,
    pub kind: CallKind,
    pub direction: CallDirection,
    /// Human-readable label, may change over the call's lifetime
    pub display_name: String,
    pub picture_url: Option<String>,
    pub state: CallState,
    pub created_at: DateTime<Utc>,
    /// Set when the hold was imposed by the engine rather than requested
    pub held_by_system: bool,
    /// Ringer silenced by the user while the call is still ringing
    pub manually_silenced: bool,
    pub muted: bool,
    /// Opaque blob owned by the engine until the session ends
    pub metadata: Option<String>,
}

impl CallSession {
    pub(crate) fn new(
        id: impl Into<CallId>,
        kind: CallKind,
        direction: CallDirection,
        display_name: impl Into<String>,
        picture_url: Option<String>,
        state: CallState,
        metadata: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            direction,
            display_name: display_name.into(),
            picture_url,
            state,
            created_at: Utc::now(),
            held_by_system: false,
            manually_silenced: false,
            muted: false,
            metadata,
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind == CallKind::Video
    }
}
