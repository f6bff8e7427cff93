//! Walk one incoming call through the engine
//!
//! Answers an incoming call, connects a Bluetooth headset mid-call, switches
//! to the speaker by hand and hangs up, printing every event as the JSON a
//! bridge layer would forward.
//!
//! ```text
//! cargo run -p callkeep-core --example call_flow
//! CALLKEEP_LOG_LEVEL=debug cargo run -p callkeep-core --example call_flow
//! CALLKEEP_LOG_JSON=1 cargo run -p callkeep-core --example call_flow
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use callkeep_core::{
    setup_logging, AdapterCallback, AdapterError, AudioDevice, AudioResult, AudioRoute,
    AudioSubsystem, CallEngine, CallId, CallKind, CallSession, ChannelListener, DeviceClass,
    EngineConfig, LoggingConfig, TelephonyAdapter,
};

/// Adapter that only logs what the OS would be told
struct LoggingAdapter;

#[async_trait]
impl TelephonyAdapter for LoggingAdapter {
    async fn mirror_incoming(&self, session: CallSession) -> Result<(), AdapterError> {
        info!("[os] show incoming call UI for {} ({})", session.display_name, session.id);
        Ok(())
    }

    async fn mirror_outgoing(&self, session: CallSession) -> Result<(), AdapterError> {
        info!("[os] register outgoing call {}", session.id);
        Ok(())
    }

    async fn mirror_hold(&self, call_id: CallId, held: bool) -> Result<(), AdapterError> {
        info!("[os] call {} held: {}", call_id, held);
        Ok(())
    }

    async fn mirror_mute(&self, call_id: CallId, muted: bool) -> Result<(), AdapterError> {
        info!("[os] call {} muted: {}", call_id, muted);
        Ok(())
    }

    async fn mirror_end(&self, call_id: CallId) -> Result<(), AdapterError> {
        info!("[os] dismiss call UI for {}", call_id);
        Ok(())
    }

    async fn mirror_display_update(&self, call_id: CallId, display_name: String) -> Result<(), AdapterError> {
        info!("[os] call {} is now shown as {}", call_id, display_name);
        Ok(())
    }
}

/// Phone with an earpiece and a speaker; other devices come and go
struct SimulatedAudio {
    devices: Mutex<Vec<AudioDevice>>,
    muted: Mutex<bool>,
}

impl SimulatedAudio {
    fn new() -> Self {
        Self {
            devices: Mutex::new(vec![
                AudioDevice::new("Receiver", DeviceClass::Earpiece),
                AudioDevice::new("Loudspeaker", DeviceClass::Speaker),
            ]),
            muted: Mutex::new(false),
        }
    }

    fn plug(&self, device: AudioDevice) {
        self.devices.lock().push(device);
    }
}

impl AudioSubsystem for SimulatedAudio {
    fn available_devices(&self) -> AudioResult<Vec<AudioDevice>> {
        Ok(self.devices.lock().clone())
    }

    fn apply_route(&self, route: AudioRoute) -> AudioResult<()> {
        info!("[audio] routing call audio to {}", route);
        Ok(())
    }

    fn is_microphone_muted(&self) -> bool {
        *self.muted.lock()
    }

    fn set_microphone_muted(&self, muted: bool) -> AudioResult<()> {
        *self.muted.lock() = muted;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let logging = LoggingConfig::from_env("call_flow").context("reading log settings")?;
    setup_logging(logging).context("installing logger")?;

    let audio = Arc::new(SimulatedAudio::new());
    let engine = CallEngine::builder()
        .config(EngineConfig::new().with_route_settle_delay_ms(200))
        .adapter(Arc::new(LoggingAdapter))
        .audio(audio.clone())
        .build()
        .context("building call engine")?;

    // Events raised before the UI attaches are replayed on attach
    engine.report_incoming("call-1", CallKind::Audio, "+1 555 0100", None, Some("{\"room\":\"standup\"}".into()))?;
    engine.update_display("call-1", "Alice")?;

    let (listener, mut events) = ChannelListener::pair();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.to_json() {
                Ok(json) => println!("event: {}", json),
                Err(e) => eprintln!("unserializable event: {}", e),
            }
        }
    });
    let replayed = engine.attach_listener(Arc::new(listener));
    info!("Replayed {} buffered events", replayed);

    // The user answers from the lock screen
    engine.handle_adapter_callback(AdapterCallback::Answer { call_id: "call-1".into() })?;
    engine.handle_adapter_callback(AdapterCallback::AudioSessionActivated)?;

    // A second call while busy is turned away
    if let Err(e) = engine.report_incoming("call-2", CallKind::Video, "Bob", None, None) {
        info!("call-2 not admitted: {}", e);
    }

    // Headphones connect mid-call; the engine switches after the settle delay
    audio.plug(AudioDevice::new("Headphones", DeviceClass::Bluetooth));
    engine.on_device_hotplug(true, DeviceClass::Bluetooth);
    tokio::time::sleep(Duration::from_millis(400)).await;
    info!("Route after hot-plug: {}", engine.audio_route());

    engine.set_audio_route(AudioRoute::Speaker);
    engine.set_muted("call-1", true)?;
    engine.set_hold("call-1", true, false)?;
    engine.set_hold("call-1", false, false)?;
    engine.end("call-1");

    info!("Stats: {:?}", engine.stats());

    engine.shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    Ok(())
}
