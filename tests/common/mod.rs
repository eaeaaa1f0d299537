//! Shared fixtures for the playback integration tests

use score_player::{
    Clef, DurationValue, Instrument, InstrumentError, Measure, Note, NoteDuration,
    PlaybackScheduler, Score, Staff, Transport, VirtualTransport, Voice,
};
use std::sync::{Arc, Mutex};

/// One recorded trigger: (voice id, pitches, beat, level)
pub type Trigger = (String, Vec<String>, f64, f64);

/// Instrument that records every trigger instead of making sound
#[derive(Default)]
pub struct RecordingInstrument {
    triggers: Mutex<Vec<Trigger>>,
    /// When set, every trigger fails (external-failure simulation)
    pub fail: Mutex<bool>,
}

impl RecordingInstrument {
    pub fn triggered(&self) -> Vec<Trigger> {
        self.triggers.lock().unwrap().clone()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.lock().unwrap().len()
    }
}

impl Instrument for RecordingInstrument {
    fn trigger(
        &self,
        voice_id: &str,
        pitches: &[String],
        _duration: NoteDuration,
        time: f64,
        level: f64,
    ) -> Result<(), InstrumentError> {
        if *self.fail.lock().unwrap() {
            return Err(InstrumentError::TriggerFailed("sampler offline".into()));
        }
        self.triggers.lock().unwrap().push((
            voice_id.to_string(),
            pitches.to_vec(),
            time,
            level,
        ));
        Ok(())
    }
}

pub fn quarter(key: &str, time: f64) -> Note {
    Note::pitched(
        vec![key.to_string()],
        NoteDuration::new(DurationValue::Quarter),
        time,
    )
}

/// A 4/4 two-hand score: right hand on beats 0 and 2, left hand on beat 0
/// of every measure
pub fn two_hand_score(measures: u32) -> Score {
    let mut score = Score::new("Practice Piece", "Anon.");
    for number in 1..=measures {
        let mut measure = Measure::new(number);
        measure.staves.push(Staff::with_voices(
            Clef::Treble,
            vec![Voice::with_notes(
                "right",
                vec![quarter("C5", 0.0), quarter("E5", 2.0)],
            )],
        ));
        measure.staves.push(Staff::with_voices(
            Clef::Bass,
            vec![Voice::with_notes("left", vec![quarter("C3", 0.0)])],
        ));
        score.measures.push(measure);
    }
    score
}

pub fn setup() -> (
    Arc<VirtualTransport>,
    Arc<RecordingInstrument>,
    PlaybackScheduler,
) {
    let transport = Arc::new(VirtualTransport::new());
    let instrument = Arc::new(RecordingInstrument::default());
    let scheduler = PlaybackScheduler::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&instrument) as Arc<dyn Instrument>,
    );
    (transport, instrument, scheduler)
}
