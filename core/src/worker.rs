//! Background-worker value slot
//!
//! A measure that does blocking work (a network probe, a slow lookup) runs it
//! on a detached thread and hands the result back through a [`WorkerSlot`].
//! The UI thread polls the slot on its next update tick; the worker never
//! touches skin or canvas state.
//!
//! Cleanup belongs to whichever side finishes last: the measure's drop marks
//! the slot detached, a still-running worker checks the flag under the lock
//! when it completes, and the shared state is freed by whichever side
//! releases it second.

use std::sync::{Arc, Mutex};
use std::thread;

struct Inner<T> {
    value: Option<T>,
    /// Command string to run on the UI thread once the result lands.
    finish_action: Option<String>,
    worker_running: bool,
    owner_dropped: bool,
}

/// Shared slot between a measure and its detached worker thread.
pub struct WorkerSlot<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for WorkerSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> WorkerSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value: None,
                finish_action: None,
                worker_running: false,
                owner_dropped: false,
            })),
        }
    }

    /// Spawn `work` on a detached thread unless one is already running.
    /// Returns whether a thread was spawned.
    pub fn spawn<F>(&self, finish_action: Option<String>, work: F) -> bool
    where
        F: FnOnce() -> T + Send + 'static,
    {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.worker_running {
                return false;
            }
            inner.worker_running = true;
            inner.finish_action = finish_action;
        }

        let slot = self.clone();
        thread::spawn(move || {
            let result = work();
            let mut inner = slot.inner.lock().unwrap();
            inner.worker_running = false;
            if inner.owner_dropped {
                // The measure is gone; drop the result quietly.
                return;
            }
            inner.value = Some(result);
        });
        true
    }

    /// Take the completed value, together with the finish action to execute
    /// on the UI thread, if a result has landed since the last poll.
    pub fn take(&self) -> Option<(T, Option<String>)> {
        let mut inner = self.inner.lock().unwrap();
        let value = inner.value.take()?;
        Some((value, inner.finish_action.take()))
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().worker_running
    }

    /// Mark the owning measure as dropped. A still-running worker will
    /// discard its result and exit quietly.
    pub fn detach(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.owner_dropped = true;
        inner.value = None;
        inner.finish_action = None;
    }
}

impl<T: Send + 'static> Default for WorkerSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
