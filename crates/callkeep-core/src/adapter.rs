//! Telephony adapter contract
//!
//! The engine mirrors its state into the platform telephony stack through a
//! [`TelephonyAdapter`] supplied by the host, and the host feeds the stack's
//! callbacks back in as [`AdapterCallback`]s.
//!
//! ```text
//! ┌──────────────┐  mirror_*() (queued)    ┌─────────────────────┐
//! │  CallEngine  │ ──────────────────────▶ │  TelephonyAdapter   │
//! │              │                         │  (ConnectionService │
//! │              │ ◀────────────────────── │   / CallKit glue)   │
//! └──────────────┘  handle_adapter_callback└─────────────────────┘
//! ```
//!
//! Mirror calls are fire-and-forget. The engine queues them and never waits on
//! them while holding its lock; one worker task delivers them in the order the
//! changes were made. If `mirror_incoming` or `mirror_outgoing` fails, the
//! engine ends the session it registered, unless that session is already gone.
//! Changes that arrive as callbacks are never mirrored back.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::session::{CallId, CallSession, EndReason};

/// Platform telephony stack, implemented by the host
#[async_trait]
pub trait TelephonyAdapter: Send + Sync {
    /// Register a ringing call with the OS
    async fn mirror_incoming(&self, session: CallSession) -> Result<(), AdapterError>;

    /// Register a locally started (or already connected) call with the OS
    async fn mirror_outgoing(&self, session: CallSession) -> Result<(), AdapterError>;

    async fn mirror_hold(&self, call_id: CallId, held: bool) -> Result<(), AdapterError>;

    async fn mirror_mute(&self, call_id: CallId, muted: bool) -> Result<(), AdapterError>;

    async fn mirror_end(&self, call_id: CallId) -> Result<(), AdapterError>;

    async fn mirror_display_update(&self, call_id: CallId, display_name: String) -> Result<(), AdapterError>;
}

/// Callbacks from the platform telephony stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCallback {
    /// The user answered from the system call UI
    Answer { call_id: CallId },
    /// The OS ended the call; `None` means the user hung up from the system UI
    End { call_id: CallId, reason: Option<EndReason> },
    HoldChanged { call_id: CallId, held: bool },
    MuteChanged { call_id: CallId, muted: bool },
    /// The OS accepted an outgoing call request
    StartConfirmed { call_id: CallId },
    AudioSessionActivated,
    AudioSessionDeactivated,
    /// DTMF digits entered on the system keypad
    Dtmf { call_id: CallId, digits: String },
}

impl AdapterCallback {
    pub fn call_id(&self) -> Option<&str> {
        match self {
            AdapterCallback::Answer { call_id }
            | AdapterCallback::End { call_id, .. }
            | AdapterCallback::HoldChanged { call_id, .. }
            | AdapterCallback::MuteChanged { call_id, .. }
            | AdapterCallback::StartConfirmed { call_id }
            | AdapterCallback::Dtmf { call_id, .. } => Some(call_id),
            AdapterCallback::AudioSessionActivated | AdapterCallback::AudioSessionDeactivated => None,
        }
    }
}
