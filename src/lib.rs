// Score Player - Polyphonic score playback scheduler
// Library exports for tests and the demo binary

pub mod playback;
pub mod score;
pub mod transport;

// Re-export commonly used types for convenience
pub use playback::{
    EventRegistry, ListenerId, MeasureChangeEvent, Metronome, NotePlayEvent, PlaybackError,
    PlaybackScheduler, Tempo, TempoSource, TimeSignature, TimelineMapper, VoiceMixer,
};
pub use score::{Clef, DurationValue, Measure, Note, NoteDuration, Score, Staff, Voice, VoiceId};
pub use transport::{
    EventCallback, EventHandle, Instrument, InstrumentError, Transport, TransportError,
    VirtualTransport,
};
