// Score data model - measures, staves, and voices
// Immutable input to the playback scheduler

use crate::playback::timeline::{Tempo, TimeSignature};
use crate::score::note::Note;
use serde::{Deserialize, Serialize};

/// Stable voice identity, unique across the whole score.
///
/// The same id recurs in every measure the voice participates in; it is
/// the sole key for mute/solo/volume commands.
pub type VoiceId = String;

/// Clef grouping for a staff (not used for timing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
}

impl Default for Clef {
    fn default() -> Self {
        Clef::Treble
    }
}

/// An independently timed melodic line within a staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub id: VoiceId,
    pub notes: Vec<Note>,
}

impl Voice {
    pub fn new(id: impl Into<VoiceId>) -> Self {
        Self {
            id: id.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_notes(id: impl Into<VoiceId>, notes: Vec<Note>) -> Self {
        Self {
            id: id.into(),
            notes,
        }
    }
}

/// A clef grouping containing one or more voices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    #[serde(default)]
    pub clef: Clef,
    pub voices: Vec<Voice>,
}

impl Staff {
    pub fn new(clef: Clef) -> Self {
        Self {
            clef,
            voices: Vec::new(),
        }
    }

    pub fn with_voices(clef: Clef, voices: Vec<Voice>) -> Self {
        Self { clef, voices }
    }
}

/// One measure of the score
///
/// `time_signature` and `tempo` apply from this measure forward until
/// overridden; omitted values inherit from the most recent measure that
/// declared one (4/4 at 120 BPM if none ever did).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// 1-based measure number
    pub number: u32,
    #[serde(default)]
    pub time_signature: Option<TimeSignature>,
    #[serde(default)]
    pub tempo: Option<Tempo>,
    pub staves: Vec<Staff>,
}

impl Measure {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            time_signature: None,
            tempo: None,
            staves: Vec::new(),
        }
    }
}

/// The full multi-voice musical input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub title: String,
    #[serde(default)]
    pub composer: String,
    pub measures: Vec<Measure>,
}

impl Score {
    pub fn new(title: impl Into<String>, composer: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            composer: composer.into(),
            measures: Vec::new(),
        }
    }

    /// All distinct voice ids, in first-appearance order
    pub fn voice_ids(&self) -> Vec<VoiceId> {
        let mut ids = Vec::new();
        for measure in &self.measures {
            for staff in &measure.staves {
                for voice in &staff.voices {
                    if !ids.contains(&voice.id) {
                        ids.push(voice.id.clone());
                    }
                }
            }
        }
        ids
    }

    /// Copy of the score keeping only the voice matching `voice_id`.
    ///
    /// Measure structure (numbers, time signatures, tempi) is preserved so
    /// the filtered copy plays at identical positions; staves that end up
    /// with no voices are dropped.
    pub fn filter_voice(&self, voice_id: &str) -> Score {
        let measures = self
            .measures
            .iter()
            .map(|measure| {
                let staves = measure
                    .staves
                    .iter()
                    .filter_map(|staff| {
                        let voices: Vec<Voice> = staff
                            .voices
                            .iter()
                            .filter(|voice| voice.id == voice_id)
                            .cloned()
                            .collect();
                        if voices.is_empty() {
                            None
                        } else {
                            Some(Staff { clef: staff.clef, voices })
                        }
                    })
                    .collect();

                Measure {
                    number: measure.number,
                    time_signature: measure.time_signature,
                    tempo: measure.tempo,
                    staves,
                }
            })
            .collect();

        Score {
            title: self.title.clone(),
            composer: self.composer.clone(),
            measures,
        }
    }
}
