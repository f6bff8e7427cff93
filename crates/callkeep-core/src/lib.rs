//! # callkeep-core - Call Session Engine
//!
//! The platform-independent core behind a mobile VoIP app's native call UI.
//! It owns the authoritative set of live calls and their state machine,
//! decides which new calls may ring, keeps the OS telephony stack in sync, and
//! picks the audio output route.
//!
//! - **Call registry** - live [`CallSession`]s and the current call pointer
//! - **Admission** - accept, auto-hold or auto-reject under single-call or
//!   multi-call policy
//! - **Audio routing** - Bluetooth > wired headset > speaker/earpiece, manual
//!   pinning, debounced hot-plug switching
//! - **Event channel** - every state change as an ordered [`Event`], buffered
//!   until a listener attaches
//! - **Telephony adapter** - the [`TelephonyAdapter`] contract the engine
//!   mirrors state into, and the [`AdapterCallback`]s it accepts back
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use callkeep_core::{
//!     AudioSubsystem, CallEngine, CallKind, ChannelListener, EngineConfig, TelephonyAdapter,
//! };
//!
//! # async fn example(adapter: Arc<dyn TelephonyAdapter>, audio: Arc<dyn AudioSubsystem>) -> callkeep_core::CallResult<()> {
//! let engine = CallEngine::builder()
//!     .config(EngineConfig::default())
//!     .adapter(adapter)
//!     .audio(audio)
//!     .build()?;
//!
//! let (listener, mut events) = ChannelListener::pair();
//! engine.attach_listener(Arc::new(listener));
//!
//! engine.report_incoming("c1", CallKind::Audio, "Alice", None, None)?;
//! engine.answer("c1", true)?;
//! engine.end("c1");
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.to_json().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod admission;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod registry;
pub mod schedule;
pub mod session;

// Re-export main types
pub use adapter::{AdapterCallback, TelephonyAdapter};
pub use audio::{AudioDevice, AudioRoute, AudioSubsystem, DeviceClass};
pub use config::EngineConfig;
pub use engine::{CallEngine, CallEngineBuilder, EngineStats};
pub use error::{AdapterError, AudioError, AudioResult, CallError, CallResult};
pub use events::{ChannelListener, Event, EventListener, EventType};
pub use logging::{setup_logging, LoggingConfig};
pub use session::{CallDirection, CallId, CallKind, CallSession, CallState, EndReason};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
