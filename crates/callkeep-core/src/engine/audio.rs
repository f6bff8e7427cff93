//! Audio route selection and hot-plug handling
//!
//! Automatic routing follows the arbiter's priority and only runs while a
//! call is live. A manual choice pins the route until the pinned device goes
//! away or the last call ends.
//!
//! When a Bluetooth or wired headset appears, the switch to it is delayed by
//! the route settle delay, since the OS usually reports a device before it
//! can carry audio. Any later hot-plug or manual choice supersedes a pending
//! switch. When a switch fires it re-reads the device list and re-applies the
//! priority, so a headset plugged in while Bluetooth is connected does not
//! steal the route.

use std::sync::Arc;

use crate::audio::{AudioDevice, AudioRoute, AudioRouteArbiter, DeviceClass, RouteChange};
use crate::engine::{CallEngine, EngineCore};
use crate::events::Event;
use crate::session::CallKind;

impl CallEngine {
    /// Route audio to `route` and pin it
    ///
    /// Returns the route in effect afterwards, which is
    /// [`AudioRoute::Unknown`] if the hardware refused.
    pub fn set_audio_route(&self, route: AudioRoute) -> AudioRoute {
        let mut core = self.inner.core.lock();

        if route == AudioRoute::Unknown {
            tracing::warn!("Ignoring request to route audio to Unknown");
            return core.arbiter.current_route();
        }

        core.route_switches.cancel_all();
        core.arbiter.pin();
        tracing::info!("Audio route {} selected manually", route);
        self.apply_route(&mut core, route);
        core.arbiter.current_route()
    }

    /// Devices currently connected, freshly enumerated
    pub fn get_audio_devices(&self) -> Vec<AudioDevice> {
        self.enumerate_devices().unwrap_or_default()
    }

    /// Feed a device connect/disconnect notification into the engine
    pub fn on_device_hotplug(&self, added: bool, class: DeviceClass) {
        let mut core = self.inner.core.lock();
        let route = class.route();
        tracing::debug!("Audio device {} {}", class_name(class), if added { "connected" } else { "disconnected" });

        let changed = if added {
            self.on_device_added(&mut core, class);
            false
        } else {
            core.route_switches.cancel(&route);
            if core.registry.is_empty() {
                core.arbiter.clear_pin();
                tracing::debug!("No live call; not rerouting after {} disconnect", class_name(class));
                false
            } else if route == core.arbiter.current_route() {
                core.arbiter.clear_pin();
                let kind = current_kind(&core);
                let target = match self.enumerate_devices() {
                    Some(devices) => AudioRouteArbiter::default_route(kind, &devices),
                    None => AudioRoute::Unknown,
                };
                tracing::info!("Active audio device {} disconnected; falling back to {}", class_name(class), target);
                self.apply_route(&mut core, target)
            } else {
                false
            }
        };

        if !changed {
            let devices = self.get_audio_devices();
            self.emit(Event::audio_devices_changed(&devices, core.arbiter.current_route()));
        }
    }

    fn on_device_added(&self, core: &mut EngineCore, class: DeviceClass) {
        if !class.is_routable() {
            return;
        }
        if core.arbiter.is_pinned() {
            tracing::debug!("Audio route is pinned; not switching to {}", class_name(class));
            return;
        }
        if core.registry.is_empty() {
            tracing::debug!("No live call; not switching to {}", class_name(class));
            return;
        }

        core.route_switches.cancel_all();
        let target = class.route();
        let engine = Arc::downgrade(&self.inner);
        core.route_switches.schedule(
            &self.inner.runtime,
            target,
            self.inner.route_settle_delay,
            move |generation| async move {
                if let Some(inner) = engine.upgrade() {
                    CallEngine::from_inner(inner).fire_route_switch(target, generation);
                }
            },
        );
    }

    fn fire_route_switch(&self, target: AudioRoute, generation: u64) {
        let mut core = self.inner.core.lock();
        if !core.route_switches.take_if_current(&target, generation) {
            return;
        }
        if core.arbiter.is_pinned() || core.registry.is_empty() {
            tracing::debug!("Dropping route switch to {}; route pinned or no live call", target);
            return;
        }

        let kind = current_kind(&core);
        if let Some(route) = self.initial_route(&core, kind) {
            self.apply_route(&mut core, route);
        }
    }

    /// Apply the priority route for a call of `kind`, unless pinned
    pub(crate) fn apply_initial_route(&self, core: &mut EngineCore, kind: CallKind) {
        if let Some(route) = self.initial_route(core, kind) {
            self.apply_route(core, route);
        }
    }

    fn initial_route(&self, core: &EngineCore, kind: CallKind) -> Option<AudioRoute> {
        if core.arbiter.is_pinned() {
            return None;
        }
        match self.enumerate_devices() {
            Some(devices) => core.arbiter.compute_initial_route(kind, &devices),
            None => Some(AudioRoute::Unknown),
        }
    }

    /// Apply `target`, publishing the change; returns whether the route changed
    fn apply_route(&self, core: &mut EngineCore, target: AudioRoute) -> bool {
        match core.arbiter.apply(target, self.inner.audio.as_ref()) {
            RouteChange::Unchanged => false,
            RouteChange::Changed { from, to } => {
                self.emit(Event::audio_route_changed(to, from));
                let devices = self.get_audio_devices();
                self.emit(Event::audio_devices_changed(&devices, to));
                true
            }
        }
    }

    fn enumerate_devices(&self) -> Option<Vec<AudioDevice>> {
        match self.inner.audio.available_devices() {
            Ok(devices) => Some(devices),
            Err(e) => {
                tracing::warn!("Audio device enumeration failed: {}", e);
                None
            }
        }
    }
}

/// Kind of the current call; routing with no call behaves as for audio
fn current_kind(core: &EngineCore) -> CallKind {
    core.registry
        .current_call()
        .map(|session| session.kind)
        .unwrap_or(CallKind::Audio)
}

fn class_name(class: DeviceClass) -> &'static str {
    match class {
        DeviceClass::Earpiece => "earpiece",
        DeviceClass::Speaker => "speaker",
        DeviceClass::Bluetooth => "bluetooth",
        DeviceClass::Headset => "headset",
    }
}
