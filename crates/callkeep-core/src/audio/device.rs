//! Audio routes, devices and the audio subsystem seam
//!
//! The engine never talks to audio hardware directly. Hosts implement
//! [`AudioSubsystem`] on top of the platform audio manager; the engine calls it
//! to enumerate devices, apply a route and read/set the microphone mute.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AudioResult;

/// Audio output route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioRoute {
    Earpiece,
    Speaker,
    Bluetooth,
    /// Wired headset or headphones
    Headset,
    /// Route could not be determined or applied
    Unknown,
}

impl AudioRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioRoute::Earpiece => "Earpiece",
            AudioRoute::Speaker => "Speaker",
            AudioRoute::Bluetooth => "Bluetooth",
            AudioRoute::Headset => "Headset",
            AudioRoute::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AudioRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware class of an audio output device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Earpiece,
    Speaker,
    Bluetooth,
    Headset,
}

impl DeviceClass {
    /// Classes whose arrival triggers an automatic switch
    pub fn is_routable(&self) -> bool {
        matches!(self, DeviceClass::Bluetooth | DeviceClass::Headset)
    }

    /// The route that sends audio to a device of this class
    pub fn route(&self) -> AudioRoute {
        match self {
            DeviceClass::Earpiece => AudioRoute::Earpiece,
            DeviceClass::Speaker => AudioRoute::Speaker,
            DeviceClass::Bluetooth => AudioRoute::Bluetooth,
            DeviceClass::Headset => AudioRoute::Headset,
        }
    }
}

/// Audio output device as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub name: String,
    #[serde(rename = "type")]
    pub class: DeviceClass,
}

impl AudioDevice {
    pub fn new(name: impl Into<String>, class: DeviceClass) -> Self {
        Self { name: name.into(), class }
    }
}

/// Platform audio hardware, implemented by the host
///
/// Calls are made while the engine holds its lock, so implementations must
/// return promptly and must not call back into the engine.
pub trait AudioSubsystem: Send + Sync {
    /// Currently connected output devices
    fn available_devices(&self) -> AudioResult<Vec<AudioDevice>>;

    /// Send call audio to `route`
    fn apply_route(&self, route: AudioRoute) -> AudioResult<()>;

    fn is_microphone_muted(&self) -> bool;

    fn set_microphone_muted(&self, muted: bool) -> AudioResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routable_classes() {
        assert!(DeviceClass::Bluetooth.is_routable());
        assert!(DeviceClass::Headset.is_routable());
        assert!(!DeviceClass::Speaker.is_routable());
        assert!(!DeviceClass::Earpiece.is_routable());
        assert_eq!(DeviceClass::Headset.route(), AudioRoute::Headset);
    }

    #[test]
    fn test_device_json_shape() {
        let device = AudioDevice::new("AirPods", DeviceClass::Bluetooth);
        let json = serde_json::to_string(&device).unwrap();
        assert_eq!(json, r#"{"name":"AirPods","type":"Bluetooth"}"#);
    }
}
