// Score module
// Immutable multi-voice score data model

pub mod note;
pub mod types;

pub use note::{DurationValue, Note, NoteDuration};
pub use types::{Clef, Measure, Score, Staff, Voice, VoiceId};
