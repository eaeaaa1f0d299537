// Listener registry - fan-out of note-play and measure-change events
// Subscribers come and go while playback is in flight

use crate::score::{NoteDuration, VoiceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Token returned by a subscribe call, used to unsubscribe
pub type ListenerId = u64;

/// Emitted when a scheduled note fires.
///
/// `velocity` is the trigger-time level: 0 when the voice was muted or
/// un-soloed after scheduling, so cursor-tracking UIs stay in sync with
/// suppressed notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotePlayEvent {
    pub pitches: Vec<String>,
    pub voice_id: VoiceId,
    pub duration: NoteDuration,
    pub time: f64,
    pub velocity: f64,
}

/// Emitted when the playhead crosses a measure boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasureChangeEvent {
    pub measure_number: u32,
    pub time: f64,
}

type NoteCallback = Arc<dyn Fn(&NotePlayEvent) + Send + Sync>;
type MeasureCallback = Arc<dyn Fn(&MeasureChangeEvent) + Send + Sync>;

#[derive(Default)]
struct ListenerState {
    next_id: ListenerId,
    note_listeners: HashMap<ListenerId, NoteCallback>,
    measure_listeners: HashMap<ListenerId, MeasureCallback>,
}

/// Subscriber lists for playback events.
///
/// Callbacks are cloned out of the lock before invocation, so a listener
/// that unsubscribes (even itself) during a notification neither deadlocks
/// nor disturbs the fan-out already in flight. Unsubscribing twice is a
/// no-op.
#[derive(Default)]
pub struct ListenerRegistry {
    state: Mutex<ListenerState>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListenerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_note_play<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&NotePlayEvent) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.note_listeners.insert(id, Arc::new(callback));
        id
    }

    pub fn on_measure_change<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&MeasureChangeEvent) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.measure_listeners.insert(id, Arc::new(callback));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        let mut state = self.lock();
        state.note_listeners.remove(&id);
        state.measure_listeners.remove(&id);
    }

    pub fn notify_note_play(&self, event: &NotePlayEvent) {
        let callbacks: Vec<NoteCallback> = self.lock().note_listeners.values().cloned().collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn notify_measure_change(&self, event: &MeasureChangeEvent) {
        let callbacks: Vec<MeasureCallback> =
            self.lock().measure_listeners.values().cloned().collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn note_listener_count(&self) -> usize {
        self.lock().note_listeners.len()
    }

    pub fn measure_listener_count(&self) -> usize {
        self.lock().measure_listeners.len()
    }

    /// Drop every subscriber (used by dispose)
    pub fn clear(&self) {
        let mut state = self.lock();
        state.note_listeners.clear();
        state.measure_listeners.clear();
    }
}
