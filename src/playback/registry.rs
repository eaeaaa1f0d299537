// Event registry - tracks every scheduled transport handle for cleanup
// No callback may survive a clear; repeated play/stop cycles must not leak

use crate::transport::{EventHandle, Transport};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Set of outstanding transport handles.
///
/// Every scheduling call records its handle here before control returns to
/// anything that could stop playback. `clear_all` is the single teardown
/// path: it cancels each tracked handle, empties the set, then issues the
/// transport's global cancel as defense-in-depth against handles scheduled
/// by decoupled subsystems that were never individually tracked.
#[derive(Debug, Default)]
pub struct EventRegistry {
    handles: Mutex<HashSet<EventHandle>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<EventHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a handle returned by the transport's schedule primitive
    pub fn register(&self, handle: EventHandle) {
        self.lock().insert(handle);
    }

    /// Cancel every tracked handle, then sweep the transport globally.
    /// Safe to call repeatedly and before anything was ever scheduled.
    pub fn clear_all(&self, transport: &dyn Transport) {
        let drained: Vec<EventHandle> = self.lock().drain().collect();
        for handle in drained {
            transport.cancel(handle);
        }
        transport.cancel_all();
    }

    /// Cancel only the tracked handles, without the global sweep.
    /// Used by subsystems sharing the transport with other schedulers.
    pub fn cancel_tracked(&self, transport: &dyn Transport) {
        let drained: Vec<EventHandle> = self.lock().drain().collect();
        for handle in drained {
            transport.cancel(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
