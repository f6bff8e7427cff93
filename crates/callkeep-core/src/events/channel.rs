//! Buffering event channel
//!
//! The channel is always in one of two modes:
//!
//! - **Buffering** - no listener attached; events queue up in emission order,
//!   capped at a fixed capacity (oldest dropped first).
//! - **Pass-through** - a listener is attached; events go straight to it.
//!
//! Attaching a listener flushes the buffer to it in order and switches to
//! pass-through. Detaching switches back to buffering. Attaching while another
//! listener is attached replaces it.
//!
//! Listeners are invoked with the channel lock held, which is what keeps the
//! flush and later emissions in one order. A listener must therefore return
//! quickly and must not call back into the engine or the channel; hand events
//! off instead, as [`ChannelListener`] does.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::events::Event;

/// Consumer of engine events
///
/// `on_event` runs while the engine holds its state lock, and that lock is
/// not reentrant. Calling any [`CallEngine`](crate::CallEngine) method from
/// inside `on_event`, including queries such as `get_call`, deadlocks.
/// Closures are accepted as listeners; one that needs engine state should
/// forward the event elsewhere first, as [`ChannelListener`] does.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: Event);
}

impl<F> EventListener for F
where
    F: Fn(Event) + Send + Sync,
{
    fn on_event(&self, event: Event) {
        self(event)
    }
}

/// Listener forwarding events into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelListener {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    /// Create a listener together with the receiving end
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl EventListener for ChannelListener {
    fn on_event(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Event receiver dropped; event discarded");
        }
    }
}

enum ChannelMode {
    Buffering(VecDeque<Event>),
    PassThrough(Arc<dyn EventListener>),
}

pub struct EventChannel {
    mode: Mutex<ChannelMode>,
    capacity: usize,
    dropped: AtomicUsize,
}

impl EventChannel {
    /// Create a channel in buffering mode holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            mode: Mutex::new(ChannelMode::Buffering(VecDeque::new())),
            capacity: capacity.max(1),
            dropped: AtomicUsize::new(0),
        }
    }

    pub fn emit(&self, event: Event) {
        let mut mode = self.mode.lock();
        match &mut *mode {
            ChannelMode::PassThrough(listener) => listener.on_event(event),
            ChannelMode::Buffering(buffer) => {
                if buffer.len() >= self.capacity {
                    if let Some(oldest) = buffer.pop_front() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            "Event buffer full ({} events); dropping oldest {}",
                            self.capacity,
                            oldest.event_type
                        );
                    }
                }
                buffer.push_back(event);
            }
        }
    }

    /// Attach `listener`, flushing buffered events to it first
    ///
    /// Returns the number of events flushed.
    pub fn attach(&self, listener: Arc<dyn EventListener>) -> usize {
        let mut mode = self.mode.lock();
        let flushed = match std::mem::replace(&mut *mode, ChannelMode::PassThrough(listener.clone())) {
            ChannelMode::Buffering(buffer) => {
                let count = buffer.len();
                for event in buffer {
                    listener.on_event(event);
                }
                count
            }
            ChannelMode::PassThrough(_) => {
                tracing::debug!("Replacing attached event listener");
                0
            }
        };

        tracing::debug!("Event listener attached; flushed {} buffered events", flushed);
        flushed
    }

    /// Detach the current listener and go back to buffering
    ///
    /// Returns `false` if no listener was attached.
    pub fn detach(&self) -> bool {
        let mut mode = self.mode.lock();
        match &*mode {
            ChannelMode::PassThrough(_) => {
                *mode = ChannelMode::Buffering(VecDeque::new());
                tracing::debug!("Event listener detached; buffering");
                true
            }
            ChannelMode::Buffering(_) => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(&*self.mode.lock(), ChannelMode::PassThrough(_))
    }

    pub fn buffered_len(&self) -> usize {
        match &*self.mode.lock() {
            ChannelMode::Buffering(buffer) => buffer.len(),
            ChannelMode::PassThrough(_) => 0,
        }
    }

    /// Drop every buffered event
    pub fn clear(&self) {
        if let ChannelMode::Buffering(buffer) = &mut *self.mode.lock() {
            buffer.clear();
        }
    }

    /// Events dropped because the buffer was full
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
