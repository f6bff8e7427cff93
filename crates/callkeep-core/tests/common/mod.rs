//! Shared fixtures for the engine integration tests
//!
//! - [`RecordingAdapter`] records every mirror call and can be told to refuse
//!   or slow down call registration.
//! - [`ScriptedAudio`] is an audio subsystem whose device list, microphone
//!   and failures are driven by the test.
//! - [`Harness`] wires both into an engine with a channel listener attached.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

use callkeep_core::{
    AdapterError, AudioDevice, AudioError, AudioResult, AudioRoute, AudioSubsystem, CallEngine,
    CallId, CallSession, ChannelListener, DeviceClass, EngineConfig, Event, EventType,
    TelephonyAdapter,
};

/// One recorded adapter call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mirrored {
    Incoming(CallId),
    Outgoing(CallId),
    Hold(CallId, bool),
    Mute(CallId, bool),
    End(CallId),
    Display(CallId, String),
}

#[derive(Default)]
pub struct RecordingAdapter {
    calls: Mutex<Vec<Mirrored>>,
    /// How many more registrations to refuse
    refusals_left: AtomicUsize,
    registration_delay: Option<Duration>,
}

impl RecordingAdapter {
    pub fn refusing() -> Self {
        let adapter = Self::default();
        adapter.refusals_left.store(usize::MAX, Ordering::SeqCst);
        adapter
    }

    /// Refuse only the first registration
    pub fn refusing_once() -> Self {
        let adapter = Self::default();
        adapter.refusals_left.store(1, Ordering::SeqCst);
        adapter
    }

    /// Registrations take `delay` before they are recorded
    pub fn with_registration_delay(mut self, delay: Duration) -> Self {
        self.registration_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Mirrored> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    async fn register(&self, entry: Mirrored) -> Result<(), AdapterError> {
        if let Some(delay) = self.registration_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().push(entry);
        let refused = self
            .refusals_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(AdapterError::refused("test adapter refuses calls"));
        }
        Ok(())
    }
}

#[async_trait]
impl TelephonyAdapter for RecordingAdapter {
    async fn mirror_incoming(&self, session: CallSession) -> Result<(), AdapterError> {
        self.register(Mirrored::Incoming(session.id)).await
    }

    async fn mirror_outgoing(&self, session: CallSession) -> Result<(), AdapterError> {
        self.register(Mirrored::Outgoing(session.id)).await
    }

    async fn mirror_hold(&self, call_id: CallId, held: bool) -> Result<(), AdapterError> {
        self.calls.lock().push(Mirrored::Hold(call_id, held));
        Ok(())
    }

    async fn mirror_mute(&self, call_id: CallId, muted: bool) -> Result<(), AdapterError> {
        self.calls.lock().push(Mirrored::Mute(call_id, muted));
        Ok(())
    }

    async fn mirror_end(&self, call_id: CallId) -> Result<(), AdapterError> {
        self.calls.lock().push(Mirrored::End(call_id));
        Ok(())
    }

    async fn mirror_display_update(&self, call_id: CallId, display_name: String) -> Result<(), AdapterError> {
        self.calls.lock().push(Mirrored::Display(call_id, display_name));
        Ok(())
    }
}

/// Audio subsystem driven by the test
pub struct ScriptedAudio {
    devices: Mutex<Vec<AudioDevice>>,
    applied: Mutex<Vec<AudioRoute>>,
    unavailable: Mutex<Vec<AudioRoute>>,
    microphone_muted: AtomicBool,
    enumeration_fails: AtomicBool,
}

impl Default for ScriptedAudio {
    fn default() -> Self {
        Self {
            devices: Mutex::new(vec![
                AudioDevice::new("Earpiece", DeviceClass::Earpiece),
                AudioDevice::new("Speaker", DeviceClass::Speaker),
            ]),
            applied: Mutex::new(Vec::new()),
            unavailable: Mutex::new(Vec::new()),
            microphone_muted: AtomicBool::new(false),
            enumeration_fails: AtomicBool::new(false),
        }
    }
}

impl ScriptedAudio {
    pub fn connect(&self, name: &str, class: DeviceClass) {
        self.devices.lock().push(AudioDevice::new(name, class));
    }

    pub fn disconnect(&self, class: DeviceClass) {
        self.devices.lock().retain(|device| device.class != class);
    }

    pub fn applied(&self) -> Vec<AudioRoute> {
        self.applied.lock().clone()
    }

    pub fn make_unavailable(&self, route: AudioRoute) {
        self.unavailable.lock().push(route);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.enumeration_fails.store(fail, Ordering::SeqCst);
    }

    pub fn set_hardware_mute(&self, muted: bool) {
        self.microphone_muted.store(muted, Ordering::SeqCst);
    }
}

impl AudioSubsystem for ScriptedAudio {
    fn available_devices(&self) -> AudioResult<Vec<AudioDevice>> {
        if self.enumeration_fails.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceEnumeration {
                message: "audio service restarting".to_string(),
            });
        }
        Ok(self.devices.lock().clone())
    }

    fn apply_route(&self, route: AudioRoute) -> AudioResult<()> {
        if self.unavailable.lock().contains(&route) {
            return Err(AudioError::RouteUnavailable { route });
        }
        self.applied.lock().push(route);
        Ok(())
    }

    fn is_microphone_muted(&self) -> bool {
        self.microphone_muted.load(Ordering::SeqCst)
    }

    fn set_microphone_muted(&self, muted: bool) -> AudioResult<()> {
        self.microphone_muted.store(muted, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub engine: CallEngine,
    pub adapter: Arc<RecordingAdapter>,
    pub audio: Arc<ScriptedAudio>,
    pub events: UnboundedReceiver<Event>,
}

impl Harness {
    /// Engine with default config and a listener attached
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, RecordingAdapter::default(), true)
    }

    pub fn build(config: EngineConfig, adapter: RecordingAdapter, attach: bool) -> Self {
        let adapter = Arc::new(adapter);
        let audio = Arc::new(ScriptedAudio::default());
        let engine = CallEngine::builder()
            .config(config)
            .adapter(adapter.clone())
            .audio(audio.clone())
            .build()
            .expect("engine should build inside a runtime");

        let (listener, events) = ChannelListener::pair();
        if attach {
            engine.attach_listener(Arc::new(listener));
        }

        Self { engine, adapter, audio, events }
    }

    /// Everything published since the last drain
    pub fn drain(&mut self) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub fn drain_types(&mut self) -> Vec<EventType> {
        self.drain().into_iter().map(|event| event.event_type).collect()
    }
}

pub fn types(events: &[Event]) -> Vec<EventType> {
    events.iter().map(|event| event.event_type).collect()
}

pub fn count(events: &[Event], event_type: EventType) -> usize {
    events.iter().filter(|event| event.event_type == event_type).count()
}

/// Let spawned adapter tasks run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}
