// Note representation for the score model
// A note is either a pitched event (one or more keys) or a rest

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbolic note value (fraction of a whole note)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl DurationValue {
    /// Length in quarter-note beats
    pub fn beats(&self) -> f64 {
        match self {
            DurationValue::Whole => 4.0,
            DurationValue::Half => 2.0,
            DurationValue::Quarter => 1.0,
            DurationValue::Eighth => 0.5,
            DurationValue::Sixteenth => 0.25,
            DurationValue::ThirtySecond => 0.125,
        }
    }
}

/// Symbolic note duration, optionally dotted
///
/// Durations stay symbolic through the whole scheduling pipeline; the
/// transport owns the conversion to wall-clock time via its tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteDuration {
    pub value: DurationValue,
    #[serde(default)]
    pub dotted: bool,
}

impl NoteDuration {
    pub fn new(value: DurationValue) -> Self {
        Self {
            value,
            dotted: false,
        }
    }

    pub fn dotted(value: DurationValue) -> Self {
        Self {
            value,
            dotted: true,
        }
    }

    /// Length in quarter-note beats (dot adds half the base value)
    pub fn beats(&self) -> f64 {
        let base = self.value.beats();
        if self.dotted { base * 1.5 } else { base }
    }

    /// Parse a duration symbol ("w", "h", "q", "8", "16", "32", dot suffix "d").
    ///
    /// Unknown symbols degrade to a plain quarter note rather than failing:
    /// one malformed note must never abort playback of the rest of the score.
    pub fn from_symbol(symbol: &str) -> Self {
        let trimmed = symbol.trim();
        let (base, dotted) = match trimmed.strip_suffix('d') {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };

        let value = match base {
            "w" | "whole" => DurationValue::Whole,
            "h" | "half" => DurationValue::Half,
            "q" | "quarter" => DurationValue::Quarter,
            "8" | "eighth" => DurationValue::Eighth,
            "16" | "sixteenth" => DurationValue::Sixteenth,
            "32" | "thirty_second" => DurationValue::ThirtySecond,
            other => {
                log::warn!("unknown duration symbol '{other}', defaulting to quarter");
                DurationValue::Quarter
            }
        };

        Self { value, dotted }
    }
}

impl Default for NoteDuration {
    fn default() -> Self {
        Self::new(DurationValue::Quarter)
    }
}

impl fmt::Display for NoteDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self.value {
            DurationValue::Whole => "w",
            DurationValue::Half => "h",
            DurationValue::Quarter => "q",
            DurationValue::Eighth => "8",
            DurationValue::Sixteenth => "16",
            DurationValue::ThirtySecond => "32",
        };
        if self.dotted {
            write!(f, "{symbol}d")
        } else {
            write!(f, "{symbol}")
        }
    }
}

/// A note in a voice: either sounding keys or a rest
///
/// The tagged variant replaces "does this note have keys?" checks: a rest
/// can never be asked for its pitches in the first place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Note {
    /// Pitched event; multiple keys sound simultaneously (a chord)
    Pitched {
        /// Pitch names, e.g. "C4", "F#5"
        keys: Vec<String>,
        duration: NoteDuration,
        /// Beat offset from the start of the containing measure
        time: f64,
    },
    /// Silence occupying the given duration
    Rest { duration: NoteDuration, time: f64 },
}

impl Note {
    pub fn pitched(keys: Vec<String>, duration: NoteDuration, time: f64) -> Self {
        Note::Pitched {
            keys,
            duration,
            time,
        }
    }

    pub fn rest(duration: NoteDuration, time: f64) -> Self {
        Note::Rest { duration, time }
    }

    /// Beat offset within the containing measure
    pub fn time(&self) -> f64 {
        match self {
            Note::Pitched { time, .. } | Note::Rest { time, .. } => *time,
        }
    }

    pub fn duration(&self) -> NoteDuration {
        match self {
            Note::Pitched { duration, .. } | Note::Rest { duration, .. } => *duration,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Note::Rest { .. })
    }
}
