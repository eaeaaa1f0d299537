// Timeline - Musical time representation and score position mapping
// Converts (measure, beat-in-measure) into tempo-independent absolute beats

use crate::score::Score;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature { numerator: 4, denominator: 4 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per measure
    pub denominator: u8, // Note value of one beat (4 = quarter, 8 = eighth)
}

impl TimeSignature {
    /// Creates a new time signature; degenerate inputs fall back to 4/4
    pub fn new(numerator: u8, denominator: u8) -> Self {
        if numerator == 0 || !denominator.is_power_of_two() {
            log::warn!("invalid time signature {numerator}/{denominator}, using 4/4");
            return Self::four_four();
        }
        Self {
            numerator,
            denominator,
        }
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    /// Common 3/4 time signature (waltz)
    pub fn three_four() -> Self {
        Self {
            numerator: 3,
            denominator: 4,
        }
    }

    /// Common 6/8 time signature
    pub fn six_eight() -> Self {
        Self {
            numerator: 6,
            denominator: 8,
        }
    }

    /// Number of beats per measure, in the unit the transport counts in
    pub fn beats_per_measure(&self) -> f64 {
        self.numerator as f64
    }

    /// Beat duration relative to a quarter note
    /// Example: 4/4 = 1.0, 6/8 = 0.5 (eighth-note beats)
    pub fn beat_duration_multiplier(&self) -> f64 {
        4.0 / self.denominator as f64
    }

    /// Measure capacity in quarter-note units
    pub fn beat_capacity(&self) -> f64 {
        self.numerator as f64 * self.beat_duration_multiplier()
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo, clamped to [20, 999] BPM
    ///
    /// Out-of-range values from a score are clamped rather than rejected;
    /// a bad tempo marking must not abort playback.
    pub fn new(bpm: f64) -> Self {
        let clamped = if bpm.is_finite() {
            bpm.clamp(20.0, 999.0)
        } else {
            120.0
        };
        Self { bpm: clamped }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Shared tempo source for the transport clock.
///
/// The score tempo and the practice-speed multiplier live in one place so
/// every tempo writer (the scheduler, scheduled tempo changes, the
/// metronome) composes with the others instead of clobbering them. Each
/// setter returns the effective BPM for the caller to push to the
/// transport.
#[derive(Debug)]
pub struct TempoSource {
    state: Mutex<TempoSourceState>,
}

#[derive(Debug)]
struct TempoSourceState {
    base_bpm: f64,
    speed: f64,
}

impl TempoSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TempoSourceState {
                base_bpm: 120.0,
                speed: 1.0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TempoSourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the musical tempo; returns the effective BPM with the speed
    /// multiplier applied
    pub fn set_base_bpm(&self, bpm: f64) -> f64 {
        let mut state = self.lock();
        state.base_bpm = bpm;
        state.base_bpm * state.speed
    }

    /// Set the speed multiplier; returns the effective BPM
    pub fn set_speed(&self, speed: f64) -> f64 {
        let mut state = self.lock();
        state.speed = speed;
        state.base_bpm * state.speed
    }

    pub fn base_bpm(&self) -> f64 {
        self.lock().base_bpm
    }

    pub fn speed(&self) -> f64 {
        self.lock().speed
    }
}

impl Default for TempoSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps symbolic score positions to absolute beat time.
///
/// Built once per playback request by a single O(measures) walk that
/// resolves time-signature/tempo inheritance and prefix-sums measure
/// lengths. Tempo never enters the beat arithmetic: tempo changes are
/// scheduled as transport mutations at measure boundaries, so boundary
/// positions stay exact across any number of tempo changes.
#[derive(Debug, Clone)]
pub struct TimelineMapper {
    start_beats: Vec<f64>,
    signatures: Vec<TimeSignature>,
    tempos: Vec<Tempo>,
    total_beats: f64,
}

impl TimelineMapper {
    pub fn new(score: &Score) -> Self {
        let mut start_beats = Vec::with_capacity(score.measures.len());
        let mut signatures = Vec::with_capacity(score.measures.len());
        let mut tempos = Vec::with_capacity(score.measures.len());

        let mut signature = TimeSignature::default();
        let mut tempo = Tempo::default();
        let mut cursor = 0.0;

        for measure in &score.measures {
            if let Some(ts) = measure.time_signature {
                signature = ts;
            }
            if let Some(t) = measure.tempo {
                tempo = t;
            }

            start_beats.push(cursor);
            signatures.push(signature);
            tempos.push(tempo);
            cursor += signature.beats_per_measure();
        }

        Self {
            start_beats,
            signatures,
            tempos,
            total_beats: cursor,
        }
    }

    pub fn measure_count(&self) -> usize {
        self.start_beats.len()
    }

    /// Absolute beat at which the measure starts (0-indexed).
    /// An index past the end returns the total length of the score.
    pub fn measure_start_beat(&self, measure_index: usize) -> f64 {
        self.start_beats
            .get(measure_index)
            .copied()
            .unwrap_or(self.total_beats)
    }

    /// Absolute beat for a note at the given offset within a measure
    pub fn absolute_beat(&self, measure_index: usize, time_in_measure: f64) -> f64 {
        self.measure_start_beat(measure_index) + time_in_measure
    }

    /// Time signature in effect at the measure (inherited if not declared)
    pub fn effective_signature(&self, measure_index: usize) -> TimeSignature {
        self.signatures
            .get(measure_index)
            .copied()
            .unwrap_or_default()
    }

    /// Tempo in effect at the measure (inherited if not declared)
    pub fn effective_tempo(&self, measure_index: usize) -> Tempo {
        self.tempos.get(measure_index).copied().unwrap_or_default()
    }

    /// Total score length in beats
    pub fn total_beats(&self) -> f64 {
        self.total_beats
    }
}
