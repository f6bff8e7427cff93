//! Ordered delivery of state changes to the telephony adapter
//!
//! Mirror commands are queued on an unbounded channel and delivered one at a
//! time by a single worker task, so the OS sees the changes for a call in the
//! order the engine made them. `mirror_end` for a call can never overtake that
//! call's registration.

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::adapter::TelephonyAdapter;
use crate::engine::{CallEngine, EngineInner};
use crate::error::AdapterError;
use crate::session::{CallDirection, CallId, CallSession};

#[derive(Debug)]
pub(crate) enum MirrorCommand {
    /// Register a new session; `serial` identifies it if the id is reused
    Register { session: CallSession, serial: u64 },
    Hold { call_id: CallId, held: bool },
    Mute { call_id: CallId, muted: bool },
    End { call_id: CallId },
    Display { call_id: CallId, display_name: String },
}

impl MirrorCommand {
    fn call_id(&self) -> &str {
        match self {
            MirrorCommand::Register { session, .. } => &session.id,
            MirrorCommand::Hold { call_id, .. }
            | MirrorCommand::Mute { call_id, .. }
            | MirrorCommand::End { call_id }
            | MirrorCommand::Display { call_id, .. } => call_id,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MirrorCommand::Register { .. } => "registration",
            MirrorCommand::Hold { .. } => "hold",
            MirrorCommand::Mute { .. } => "mute",
            MirrorCommand::End { .. } => "end",
            MirrorCommand::Display { .. } => "display update",
        }
    }
}

pub(crate) type MirrorSender = mpsc::UnboundedSender<MirrorCommand>;
pub(crate) type MirrorReceiver = mpsc::UnboundedReceiver<MirrorCommand>;

pub(crate) fn channel() -> (MirrorSender, MirrorReceiver) {
    mpsc::unbounded_channel()
}

/// Start the worker draining `rx`
///
/// The worker stops once the engine is dropped and its sender with it.
pub(crate) fn spawn_worker(
    runtime: &Handle,
    adapter: Arc<dyn TelephonyAdapter>,
    engine: Weak<EngineInner>,
    mut rx: MirrorReceiver,
) {
    runtime.spawn(async move {
        while let Some(command) = rx.recv().await {
            deliver(adapter.as_ref(), &engine, command).await;
        }
        tracing::debug!("Adapter mirror queue closed");
    });
}

async fn deliver(adapter: &dyn TelephonyAdapter, engine: &Weak<EngineInner>, command: MirrorCommand) {
    let call_id = command.call_id().to_string();
    let what = command.label();

    let result: Result<(), AdapterError> = match command {
        MirrorCommand::Register { session, serial } => {
            let result = match session.direction {
                CallDirection::Incoming => adapter.mirror_incoming(session).await,
                CallDirection::Outgoing => adapter.mirror_outgoing(session).await,
            };
            if let Err(e) = result {
                tracing::warn!("Telephony stack did not accept call {}: {}", call_id, e);
                if let Some(inner) = engine.upgrade() {
                    CallEngine::from_inner(inner).end_failed_registration(&call_id, serial);
                }
            }
            return;
        }
        MirrorCommand::Hold { call_id, held } => adapter.mirror_hold(call_id, held).await,
        MirrorCommand::Mute { call_id, muted } => adapter.mirror_mute(call_id, muted).await,
        MirrorCommand::End { call_id } => adapter.mirror_end(call_id).await,
        MirrorCommand::Display { call_id, display_name } => {
            adapter.mirror_display_update(call_id, display_name).await
        }
    };

    if let Err(e) = result {
        tracing::warn!("Adapter {} for call {} failed: {}", what, call_id, e);
    }
}
