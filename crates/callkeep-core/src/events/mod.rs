//! Outbound events
//!
//! Every state change the engine makes is published as an [`Event`]: an
//! [`EventType`] plus a flat string key/value payload. Events serialize to JSON
//! as `{"type": "CallEnded", "payload": {"callId": "c1", ...}}` so a bridge
//! layer can forward them across a process or language boundary unchanged.
//!
//! Events are delivered through the [`EventChannel`], which buffers them while
//! no listener is attached.

pub mod channel;

pub use channel::{ChannelListener, EventChannel, EventListener};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::audio::{AudioDevice, AudioRoute};
use crate::session::{CallSession, EndReason};

/// Flat key/value event payload
pub type EventPayload = BTreeMap<String, String>;

/// Kinds of events published by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// An incoming call was answered on this device
    CallAnswered,
    /// The remote party answered a call placed from this device
    OutgoingCallAnswered,
    CallHeld,
    CallUnheld,
    CallMuted,
    CallUnmuted,
    CallEnded,
    /// A call request was auto-rejected by the admission policy
    CallRejected,
    CallDisplayUpdated,
    /// The OS confirmed it started an outgoing call
    CallStarted,
    DtmfReceived,
    AudioRouteChanged,
    AudioDevicesChanged,
    AudioSessionActivated,
    AudioSessionDeactivated,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One published event; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            payload: EventPayload::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    fn with_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.get("callId")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    // ===== Constructors used by the engine =====

    pub(crate) fn call_answered(session: &CallSession, local: bool) -> Self {
        let event_type = if local {
            EventType::CallAnswered
        } else {
            EventType::OutgoingCallAnswered
        };
        Event::new(event_type)
            .with("callId", session.id.as_str())
            .with_opt("metadata", session.metadata.as_deref())
    }

    pub(crate) fn call_hold_changed(session: &CallSession) -> Self {
        let held = session.state == crate::session::CallState::Held;
        let event_type = if held { EventType::CallHeld } else { EventType::CallUnheld };
        Event::new(event_type)
            .with("callId", session.id.as_str())
            .with("heldBySystem", session.held_by_system.to_string())
    }

    pub(crate) fn call_mute_changed(call_id: &str, muted: bool) -> Self {
        let event_type = if muted { EventType::CallMuted } else { EventType::CallUnmuted };
        Event::new(event_type).with("callId", call_id)
    }

    pub(crate) fn call_ended(session: &CallSession, reason: EndReason) -> Self {
        Event::new(EventType::CallEnded)
            .with("callId", session.id.as_str())
            .with("reason", reason.as_str())
            .with_opt("metadata", session.metadata.as_deref())
    }

    pub(crate) fn call_rejected(call_id: &str, reason: &str) -> Self {
        Event::new(EventType::CallRejected)
            .with("callId", call_id)
            .with("reason", reason)
    }

    pub(crate) fn call_display_updated(call_id: &str, display_name: &str) -> Self {
        Event::new(EventType::CallDisplayUpdated)
            .with("callId", call_id)
            .with("displayName", display_name)
    }

    pub(crate) fn call_started(call_id: &str) -> Self {
        Event::new(EventType::CallStarted).with("callId", call_id)
    }

    pub(crate) fn dtmf_received(call_id: &str, digits: &str) -> Self {
        Event::new(EventType::DtmfReceived)
            .with("callId", call_id)
            .with("digits", digits)
    }

    pub(crate) fn audio_route_changed(route: AudioRoute, previous: AudioRoute) -> Self {
        Event::new(EventType::AudioRouteChanged)
            .with("route", route.as_str())
            .with("previousRoute", previous.as_str())
    }

    pub(crate) fn audio_devices_changed(devices: &[AudioDevice], selected: AudioRoute) -> Self {
        // A Vec of plain structs cannot fail to serialize
        let devices = serde_json::to_string(devices).unwrap_or_else(|_| "[]".to_string());
        Event::new(EventType::AudioDevicesChanged)
            .with("devices", devices)
            .with("selected", selected.as_str())
    }

    pub(crate) fn audio_session(activated: bool) -> Self {
        if activated {
            Event::new(EventType::AudioSessionActivated)
        } else {
            Event::new(EventType::AudioSessionDeactivated)
        }
    }
}
