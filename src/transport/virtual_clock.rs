// Virtual transport - software beat clock for tests and offline rendering
// Fires scheduled callbacks in beat order when explicitly advanced

use super::{EventCallback, EventHandle, Transport, TransportError};
use std::sync::Mutex;
use std::sync::PoisonError;

struct ScheduledEvent {
    handle: EventHandle,
    beat: f64,
    callback: EventCallback,
}

#[derive(Default)]
struct ClockState {
    events: Vec<ScheduledEvent>,
    next_handle: EventHandle,
    position: f64,
    bpm: f64,
    running: bool,
    cancel_calls: u64,
    cancel_all_calls: u64,
    tempo_log: Vec<(f64, f64)>,
}

/// A beat-domain clock driven by explicit `advance_to` calls.
///
/// Used by the integration tests and the demo binary; a real deployment
/// supplies a wall-clock transport instead. The clock keeps counters for
/// cancel invocations and a log of tempo changes so tests can assert on
/// the scheduler's cleanup and tempo-boundary behavior.
pub struct VirtualTransport {
    state: Mutex<ClockState>,
}

impl VirtualTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                bpm: 120.0,
                ..ClockState::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the playhead to `target`, firing every due callback in
    /// non-decreasing beat order. Callbacks run with the clock unlocked,
    /// so they may schedule or cancel further events.
    pub fn advance_to(&self, target: f64) {
        loop {
            let (beat, mut callback) = {
                let mut state = self.lock();
                if !state.running {
                    return;
                }

                // Earliest due event; handle order breaks beat ties
                let due = state
                    .events
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.beat <= target)
                    .min_by(|(_, a), (_, b)| {
                        a.beat
                            .partial_cmp(&b.beat)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.handle.cmp(&b.handle))
                    })
                    .map(|(i, _)| i);

                match due {
                    Some(index) => {
                        let event = state.events.swap_remove(index);
                        state.position = state.position.max(event.beat);
                        (event.beat, event.callback)
                    }
                    None => {
                        state.position = state.position.max(target);
                        return;
                    }
                }
            };

            callback(beat);
        }
    }

    /// Number of events still queued
    pub fn pending_count(&self) -> usize {
        self.lock().events.len()
    }

    /// Beat of the earliest queued event, if any
    pub fn earliest_beat(&self) -> Option<f64> {
        self.lock()
            .events
            .iter()
            .map(|e| e.beat)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn tempo(&self) -> f64 {
        self.lock().bpm
    }

    /// Every `set_tempo` call as (playhead beat, bpm)
    pub fn tempo_log(&self) -> Vec<(f64, f64)> {
        self.lock().tempo_log.clone()
    }

    /// Total individual `cancel` invocations
    pub fn cancel_calls(&self) -> u64 {
        self.lock().cancel_calls
    }

    /// Total `cancel_all` invocations
    pub fn cancel_all_calls(&self) -> u64 {
        self.lock().cancel_all_calls
    }
}

impl Default for VirtualTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for VirtualTransport {
    fn schedule(&self, beat: f64, callback: EventCallback) -> EventHandle {
        let mut state = self.lock();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.events.push(ScheduledEvent {
            handle,
            beat,
            callback,
        });
        handle
    }

    fn cancel(&self, handle: EventHandle) {
        let mut state = self.lock();
        state.cancel_calls += 1;
        state.events.retain(|e| e.handle != handle);
    }

    fn cancel_all(&self) {
        let mut state = self.lock();
        state.cancel_all_calls += 1;
        state.events.clear();
    }

    fn start(&self) -> Result<(), TransportError> {
        self.lock().running = true;
        Ok(())
    }

    fn stop(&self) {
        self.lock().running = false;
    }

    fn seek(&self, beat: f64) {
        self.lock().position = beat;
    }

    fn set_tempo(&self, bpm: f64) {
        let mut state = self.lock();
        state.bpm = bpm;
        let position = state.position;
        state.tempo_log.push((position, bpm));
    }

    fn now(&self) -> f64 {
        self.lock().position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_events_fire_in_beat_order() {
        let transport = VirtualTransport::new();
        let fired = Arc::new(Mutex::new(Vec::new()));

        for beat in [3.0, 1.0, 2.0] {
            let fired = Arc::clone(&fired);
            transport.schedule(
                beat,
                Box::new(move |b| {
                    fired.lock().unwrap().push(b);
                }),
            );
        }

        transport.start().unwrap();
        transport.advance_to(4.0);

        assert_eq!(*fired.lock().unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(transport.now(), 4.0);
    }

    #[test]
    fn test_events_do_not_fire_past_target() {
        let transport = VirtualTransport::new();
        let count = Arc::new(AtomicUsize::new(0));

        for beat in [1.0, 5.0] {
            let count = Arc::clone(&count);
            transport.schedule(
                beat,
                Box::new(move |_| {
                    count.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        transport.start().unwrap();
        transport.advance_to(2.0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(transport.pending_count(), 1);
    }

    #[test]
    fn test_cancel_removes_event() {
        let transport = VirtualTransport::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        let handle = transport.schedule(
            1.0,
            Box::new(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        transport.cancel(handle);
        transport.start().unwrap();
        transport.advance_to(2.0);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(transport.cancel_calls(), 1);
    }

    #[test]
    fn test_cancel_unknown_handle_is_noop() {
        let transport = VirtualTransport::new();
        transport.cancel(12345);
        assert_eq!(transport.cancel_calls(), 1);
    }

    #[test]
    fn test_cancel_all_clears_queue() {
        let transport = VirtualTransport::new();
        transport.schedule(1.0, Box::new(|_| {}));
        transport.schedule(2.0, Box::new(|_| {}));

        transport.cancel_all();
        assert_eq!(transport.pending_count(), 0);
    }

    #[test]
    fn test_no_fire_while_stopped() {
        let transport = VirtualTransport::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        transport.schedule(
            1.0,
            Box::new(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        transport.advance_to(2.0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_may_schedule_more_events() {
        let transport = Arc::new(VirtualTransport::new());
        let fired = Arc::new(Mutex::new(Vec::new()));

        let t = Arc::clone(&transport);
        let f = Arc::clone(&fired);
        transport.schedule(
            1.0,
            Box::new(move |beat| {
                f.lock().unwrap().push(beat);
                let f2 = Arc::clone(&f);
                t.schedule(
                    beat + 1.0,
                    Box::new(move |b| {
                        f2.lock().unwrap().push(b);
                    }),
                );
            }),
        );

        transport.start().unwrap();
        transport.advance_to(3.0);

        assert_eq!(*fired.lock().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_tempo_log_records_position() {
        let transport = VirtualTransport::new();
        transport.start().unwrap();
        transport.set_tempo(90.0);
        transport.advance_to(4.0);
        transport.set_tempo(140.0);

        assert_eq!(transport.tempo_log(), vec![(0.0, 90.0), (4.0, 140.0)]);
        assert_eq!(transport.tempo(), 140.0);
    }

    #[test]
    fn test_seek_and_stop_preserve_position() {
        let transport = VirtualTransport::new();
        transport.seek(8.0);
        assert_eq!(transport.now(), 8.0);

        transport.start().unwrap();
        transport.stop();
        assert_eq!(transport.now(), 8.0);
    }
}
