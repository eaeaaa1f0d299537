// Playback module
// Timeline mapping, event-handle tracking, voice mixing, metronome, and
// the scheduler that ties them to the transport

pub mod listeners;
pub mod metronome;
pub mod mixer;
pub mod registry;
pub mod scheduler;
pub mod timeline;

pub use listeners::{ListenerId, ListenerRegistry, MeasureChangeEvent, NotePlayEvent};
pub use metronome::{ClickType, METRONOME_VOICE, Metronome};
pub use mixer::VoiceMixer;
pub use registry::EventRegistry;
pub use scheduler::{PlaybackError, PlaybackScheduler};
pub use timeline::{Tempo, TempoSource, TimeSignature, TimelineMapper};
