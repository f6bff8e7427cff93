//! Cancelable delayed tasks keyed by target
//!
//! Each key has at most one pending task. Scheduling a key again aborts the
//! previous task for that key. Every task carries a generation number; when it
//! fires it must call [`DebouncedTasks::take_if_current`] under the owner's lock
//! and bail out if that returns `false`. Aborting alone is not enough because a
//! task may already be past its last await point when it is superseded.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct PendingTask {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
pub struct DebouncedTasks<K> {
    next_generation: u64,
    pending: HashMap<K, PendingTask>,
}

impl<K> DebouncedTasks<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            next_generation: 0,
            pending: HashMap::new(),
        }
    }

    /// Run `task(generation)` after `delay`, superseding any pending task for `key`
    pub fn schedule<F, Fut>(&mut self, runtime: &Handle, key: K, delay: Duration, task: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel(&key);

        self.next_generation += 1;
        let generation = self.next_generation;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task(generation).await;
        });

        tracing::debug!("Scheduled {:?} (generation {}) in {:?}", key, generation, delay);
        self.pending.insert(key, PendingTask { generation, handle });
        generation
    }

    /// Claim the pending slot for a task that just fired
    ///
    /// Returns `false` if the task was canceled or superseded in the meantime.
    pub fn take_if_current(&mut self, key: &K, generation: u64) -> bool {
        match self.pending.get(key) {
            Some(task) if task.generation == generation => {
                self.pending.remove(key);
                true
            }
            _ => {
                tracing::debug!("Dropping stale {:?} (generation {})", key, generation);
                false
            }
        }
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(task) => {
                task.handle.abort();
                tracing::debug!("Canceled pending {:?} (generation {})", key, task.generation);
                true
            }
            None => false,
        }
    }

    /// Abort every pending task, returning how many were pending
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        for (_, task) in self.pending.drain() {
            task.handle.abort();
        }
        count
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K> Drop for DebouncedTasks<K> {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.handle.abort();
        }
    }
}
