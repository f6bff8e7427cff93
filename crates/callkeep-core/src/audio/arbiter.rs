//! Audio route arbiter
//!
//! Tracks the active route and the manual pin, and decides which route a call
//! should use. Priority when not pinned:
//!
//! ```text
//! Bluetooth > wired Headset > (Video ⇒ Speaker | Audio ⇒ Earpiece)
//! ```
//!
//! The device list is never cached here; callers pass a fresh enumeration.

use crate::audio::device::{AudioDevice, AudioRoute, AudioSubsystem, DeviceClass};
use crate::session::CallKind;

/// Result of applying a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    /// Target equals the current route; nothing was applied
    Unchanged,
    Changed { from: AudioRoute, to: AudioRoute },
}

#[derive(Debug)]
pub struct AudioRouteArbiter {
    current: AudioRoute,
    pinned: bool,
}

impl AudioRouteArbiter {
    pub fn new() -> Self {
        Self {
            current: AudioRoute::Earpiece,
            pinned: false,
        }
    }

    /// The priority route for `kind` given the connected devices
    pub fn default_route(kind: CallKind, devices: &[AudioDevice]) -> AudioRoute {
        let has = |class: DeviceClass| devices.iter().any(|d| d.class == class);

        if has(DeviceClass::Bluetooth) {
            AudioRoute::Bluetooth
        } else if has(DeviceClass::Headset) {
            AudioRoute::Headset
        } else if kind == CallKind::Video {
            AudioRoute::Speaker
        } else {
            AudioRoute::Earpiece
        }
    }

    /// Route to use at call start/answer, or `None` while a manual choice is pinned
    pub fn compute_initial_route(&self, kind: CallKind, devices: &[AudioDevice]) -> Option<AudioRoute> {
        if self.pinned {
            return None;
        }
        Some(Self::default_route(kind, devices))
    }

    /// Apply `target`, unless it is already the current route
    ///
    /// A hardware failure degrades the route to [`AudioRoute::Unknown`].
    /// `Unknown` itself is recorded without touching the hardware.
    pub fn apply(&mut self, target: AudioRoute, audio: &dyn AudioSubsystem) -> RouteChange {
        if target == self.current {
            return RouteChange::Unchanged;
        }

        let to = if target == AudioRoute::Unknown {
            AudioRoute::Unknown
        } else {
            match audio.apply_route(target) {
                Ok(()) => target,
                Err(e) => {
                    tracing::warn!("Failed to apply audio route {}: {}", target, e);
                    AudioRoute::Unknown
                }
            }
        };

        if to == self.current {
            return RouteChange::Unchanged;
        }

        let from = self.current;
        self.current = to;
        tracing::info!("Audio route changed {} -> {}", from, to);
        RouteChange::Changed { from, to }
    }

    pub fn current_route(&self) -> AudioRoute {
        self.current
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn pin(&mut self) {
        self.pinned = true;
    }

    pub fn clear_pin(&mut self) {
        if self.pinned {
            tracing::debug!("Manual audio route pin cleared");
        }
        self.pinned = false;
    }
}
