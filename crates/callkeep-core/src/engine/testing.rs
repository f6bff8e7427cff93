//! Inert collaborators for in-crate engine tests

use std::sync::Arc;

use async_trait::async_trait;

use crate::adapter::TelephonyAdapter;
use crate::audio::{AudioDevice, AudioRoute, AudioSubsystem};
use crate::engine::CallEngine;
use crate::error::{AdapterError, AudioError, AudioResult};
use crate::session::{CallId, CallSession};

pub(crate) struct NullAdapter;

#[async_trait]
impl TelephonyAdapter for NullAdapter {
    async fn mirror_incoming(&self, _session: CallSession) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn mirror_outgoing(&self, _session: CallSession) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn mirror_hold(&self, _call_id: CallId, _held: bool) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn mirror_mute(&self, _call_id: CallId, _muted: bool) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn mirror_end(&self, _call_id: CallId) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn mirror_display_update(&self, _call_id: CallId, _name: String) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Audio subsystem with only the built-in devices
pub(crate) struct NullAudio;

impl AudioSubsystem for NullAudio {
    fn available_devices(&self) -> AudioResult<Vec<AudioDevice>> {
        Ok(Vec::new())
    }
    fn apply_route(&self, _route: AudioRoute) -> AudioResult<()> {
        Ok(())
    }
    fn is_microphone_muted(&self) -> bool {
        false
    }
    fn set_microphone_muted(&self, _muted: bool) -> AudioResult<()> {
        Ok(())
    }
}

/// Audio subsystem whose hardware calls all fail
pub(crate) struct BrokenAudio;

impl AudioSubsystem for BrokenAudio {
    fn available_devices(&self) -> AudioResult<Vec<AudioDevice>> {
        Err(AudioError::DeviceEnumeration { message: "no audio service".to_string() })
    }
    fn apply_route(&self, route: AudioRoute) -> AudioResult<()> {
        Err(AudioError::RouteUnavailable { route })
    }
    fn is_microphone_muted(&self) -> bool {
        false
    }
    fn set_microphone_muted(&self, _muted: bool) -> AudioResult<()> {
        Err(AudioError::Platform { message: "microphone busy".to_string() })
    }
}

pub(crate) fn engine_with(audio: Arc<dyn AudioSubsystem>) -> CallEngine {
    CallEngine::builder()
        .adapter(Arc::new(NullAdapter))
        .audio(audio)
        .build()
        .expect("engine should build inside a runtime")
}
