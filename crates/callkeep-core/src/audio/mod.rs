//! Audio route arbitration
//!
//! - [`device`] - routes, device classes and the [`AudioSubsystem`] trait hosts implement
//! - [`arbiter`] - the route state (current route + manual pin) and the priority rules

pub mod arbiter;
pub mod device;

pub use arbiter::{AudioRouteArbiter, RouteChange};
pub use device::{AudioDevice, AudioRoute, AudioSubsystem, DeviceClass};

/// Default settle delay before an automatic switch to a newly connected device
pub const DEFAULT_ROUTE_SETTLE_DELAY_MS: u64 = 300;
