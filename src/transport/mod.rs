// Transport boundary - external audio clock and instrument capabilities
// The scheduler only ever talks beats; the transport owns wall-clock time

pub mod virtual_clock;

use crate::score::NoteDuration;

pub use virtual_clock::VirtualTransport;

/// Opaque token identifying one scheduled callback, used for cancellation
pub type EventHandle = u64;

/// Callback fired by the transport; the argument is the beat at which the
/// event fired
pub type EventCallback = Box<dyn FnMut(f64) + Send>;

/// Errors from the audio clock boundary
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("audio clock failed to start: {0}")]
    StartFailed(String),
}

/// Errors from the sound-producing boundary
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error("trigger failed: {0}")]
    TriggerFailed(String),
}

/// The real-time audio clock the scheduler drives.
///
/// All timing is in beats; the transport converts beats to seconds via its
/// tempo setting. Callbacks fire in non-decreasing beat order on a single
/// execution context. `start` on a running clock and `stop` on a stopped
/// one are no-ops; `stop` preserves the current position (pause support)
/// and `seek` repositions without dropping scheduled events.
pub trait Transport: Send + Sync {
    /// Enqueue a one-shot callback at an absolute beat, returning its handle
    fn schedule(&self, beat: f64, callback: EventCallback) -> EventHandle;

    /// Cancel one scheduled callback; unknown handles are ignored
    fn cancel(&self, handle: EventHandle);

    /// Cancel every scheduled callback, tracked or not
    fn cancel_all(&self);

    fn start(&self) -> Result<(), TransportError>;

    fn stop(&self);

    /// Move the playhead to an absolute beat
    fn seek(&self, beat: f64);

    fn set_tempo(&self, bpm: f64);

    /// Current playhead position in beats
    fn now(&self) -> f64;
}

/// The sound-producing capability.
///
/// `voice_id` lets an implementation route each voice to its own timbre.
/// Failures are contained by the caller; a bad trigger never aborts the
/// remaining schedule.
pub trait Instrument: Send + Sync {
    fn trigger(
        &self,
        voice_id: &str,
        pitches: &[String],
        duration: NoteDuration,
        time: f64,
        level: f64,
    ) -> Result<(), InstrumentError>;
}
