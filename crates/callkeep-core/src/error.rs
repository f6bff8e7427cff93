//! Error types for the call session engine
//!
//! Every error here aborts only the operation that produced it; the engine
//! itself keeps running. Errors fall into a few categories:
//!
//! - **Admission** - `Collision` and `Validation`: the request lost against
//!   the current set of calls. These are also published as `CallRejected`
//!   events because the trigger often has no synchronous caller.
//! - **Lookup** - `Duplicate` and `NotFound`: the id is (or isn't) live.
//! - **Setup** - `NoRuntime` and `Config`: the engine could not be built.
//!
//! # Example
//!
//! ```rust,no_run
//! # use callkeep_core::{CallEngine, CallError, CallKind};
//! # fn example(engine: &CallEngine) {
//! match engine.report_incoming("c2", CallKind::Audio, "Alice", None, None) {
//!     Ok(()) => println!("ringing"),
//!     Err(CallError::Collision { reason, .. }) => println!("auto-rejected: {}", reason),
//!     Err(e) => eprintln!("{} error: {}", e.category(), e),
//! }
//! # }
//! ```

use thiserror::Error;

use crate::audio::AudioRoute;

/// Result type alias for engine operations
pub type CallResult<T> = Result<T, CallError>;

/// Errors returned by [`CallEngine`](crate::CallEngine) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// An incoming call conflicts with an existing incoming/active call
    #[error("Call {call_id} collides with an existing call: {reason}")]
    Collision { call_id: String, reason: String },

    /// An outgoing call was requested while disallowed
    #[error("Call {call_id} rejected: {reason}")]
    Validation { call_id: String, reason: String },

    #[error("Call already exists: {call_id}")]
    Duplicate { call_id: String },

    #[error("Call not found: {call_id}")]
    NotFound { call_id: String },

    #[error("No tokio runtime available to drive the engine")]
    NoRuntime,

    #[error("Invalid configuration: {field} - {reason}")]
    Config { field: String, reason: String },
}

impl CallError {
    pub fn collision(call_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Collision { call_id: call_id.into(), reason: reason.into() }
    }

    pub fn validation(call_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation { call_id: call_id.into(), reason: reason.into() }
    }

    pub fn duplicate(call_id: impl Into<String>) -> Self {
        Self::Duplicate { call_id: call_id.into() }
    }

    pub fn not_found(call_id: impl Into<String>) -> Self {
        Self::NotFound { call_id: call_id.into() }
    }

    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config { field: field.into(), reason: reason.into() }
    }

    /// True for errors that were also published as a `CallRejected` event
    pub fn is_rejection(&self) -> bool {
        matches!(self, CallError::Collision { .. } | CallError::Validation { .. })
    }

    /// The call id this error is about, if any
    pub fn call_id(&self) -> Option<&str> {
        match self {
            CallError::Collision { call_id, .. }
            | CallError::Validation { call_id, .. }
            | CallError::Duplicate { call_id }
            | CallError::NotFound { call_id } => Some(call_id),
            CallError::NoRuntime | CallError::Config { .. } => None,
        }
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            CallError::Collision { .. } | CallError::Validation { .. } => "admission",
            CallError::Duplicate { .. } | CallError::NotFound { .. } => "lookup",
            CallError::NoRuntime | CallError::Config { .. } => "setup",
        }
    }
}

/// Errors reported by a [`TelephonyAdapter`](crate::adapter::TelephonyAdapter)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The OS telephony stack refused the request
    #[error("Telephony stack refused the request: {reason}")]
    Refused { reason: String },

    /// The OS telephony stack could not be reached
    #[error("Telephony stack unavailable: {reason}")]
    Unavailable { reason: String },
}

impl AdapterError {
    pub fn refused(reason: impl Into<String>) -> Self {
        Self::Refused { reason: reason.into() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }
}

/// Errors reported by an [`AudioSubsystem`](crate::audio::AudioSubsystem)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Audio device enumeration failed: {message}")]
    DeviceEnumeration { message: String },

    #[error("Audio route not available: {route}")]
    RouteUnavailable { route: AudioRoute },

    #[error("Platform audio error: {message}")]
    Platform { message: String },
}

/// Result type for audio subsystem operations
pub type AudioResult<T> = Result<T, AudioError>;
