//! Edge case tests for the playback scheduler
//!
//! Mid-flight mixer mutation, tempo-change boundaries, partial starts,
//! and graceful degradation of malformed input.

mod common;

use common::{quarter, setup, two_hand_score, RecordingInstrument};
use score_player::{
    Clef, DurationValue, Measure, Note, NoteDuration, Score, Staff, Tempo, TimeSignature, Voice,
};
use std::sync::{Arc, Mutex};

#[test]
fn test_mute_after_scheduling_silences_pending_note() {
    let (transport, instrument, scheduler) = setup();

    let mut score = Score::new("Mute", "");
    let mut measure = Measure::new(1);
    measure.staves.push(Staff::with_voices(
        Clef::Bass,
        vec![Voice::with_notes("left", vec![quarter("G3", 3.0)])],
    ));
    score.measures.push(measure);

    let velocities = Arc::new(Mutex::new(Vec::new()));
    let velocities_clone = Arc::clone(&velocities);
    scheduler.on_note_play(move |event| {
        velocities_clone.lock().unwrap().push(event.velocity);
    });

    scheduler.play_score(&score, 1).unwrap();
    transport.advance_to(2.0);
    scheduler.mute_voice("left");
    transport.advance_to(4.0);

    // Sound suppressed, listener still informed with velocity 0
    assert_eq!(instrument.trigger_count(), 0);
    assert_eq!(*velocities.lock().unwrap(), vec![0.0]);
}

#[test]
fn test_unmute_mid_flight_restores_pending_note() {
    let (transport, instrument, scheduler) = setup();
    let score = two_hand_score(2);

    scheduler.mute_voice("right");
    scheduler.play_score(&score, 1).unwrap();
    transport.advance_to(3.0);
    scheduler.unmute_voice("right");
    transport.advance_to(8.0);

    // Right-hand notes scheduled while muted sound again after unmute
    let right: Vec<_> = instrument
        .triggered()
        .into_iter()
        .filter(|(voice, ..)| voice == "right")
        .collect();
    assert!(!right.is_empty());
    assert!(right.iter().all(|(_, _, time, _)| *time >= 3.0));
}

#[test]
fn test_solo_mid_flight() {
    let (transport, instrument, scheduler) = setup();
    let score = two_hand_score(2);
    scheduler.set_voice_volume("right", 0.8);

    scheduler.play_score(&score, 1).unwrap();
    transport.advance_to(1.0);
    scheduler.solo_voice("right");
    transport.advance_to(8.0);

    let late: Vec<_> = instrument
        .triggered()
        .into_iter()
        .filter(|(_, _, time, _)| *time > 1.0)
        .collect();
    assert!(!late.is_empty());
    assert!(late.iter().all(|(voice, ..)| voice == "right"));
    // Soloed voice plays at its own volume
    assert!(late.iter().all(|(.., level)| *level == 0.8));
}

#[test]
fn test_tempo_change_at_exact_measure_boundary() {
    let (transport, _, scheduler) = setup();

    let mut score = two_hand_score(4);
    score.measures[0].time_signature = Some(TimeSignature::three_four());
    score.measures[0].tempo = Some(Tempo::new(120.0));
    score.measures[2].tempo = Some(Tempo::new(72.0));

    scheduler.play_score(&score, 1).unwrap();
    transport.advance_to(12.0);

    // 3/4 measures: measure 3 starts at beat 6, and the change fires there
    let log = transport.tempo_log();
    assert!(log.contains(&(6.0, 72.0)));
    assert!(!log.iter().any(|(beat, bpm)| *bpm == 72.0 && *beat != 6.0));
}

#[test]
fn test_six_eight_metronome_accents_align_with_measures() {
    let (transport, instrument, scheduler) = setup();

    let mut score = Score::new("Jig", "");
    for number in 1..=2u32 {
        let mut measure = Measure::new(number);
        if number == 1 {
            measure.time_signature = Some(TimeSignature::six_eight());
        }
        measure.staves.push(Staff::with_voices(
            Clef::Treble,
            vec![Voice::with_notes("right", vec![quarter("D5", 0.0)])],
        ));
        score.measures.push(measure);
    }

    scheduler.play_score(&score, 1).unwrap();
    scheduler
        .start_metronome(TimeSignature::six_eight(), Tempo::new(120.0))
        .unwrap();
    transport.advance_to(12.0);

    let triggers = instrument.triggered();
    let note_beats: Vec<f64> = triggers
        .iter()
        .filter(|(voice, ..)| voice == "right")
        .map(|(_, _, time, _)| *time)
        .collect();
    let accent_beats: Vec<f64> = triggers
        .iter()
        .filter(|(voice, pitches, ..)| voice == "metronome" && pitches[0] == "G5")
        .map(|(_, _, time, _)| *time)
        .collect();

    // A 6/8 measure spans 6 transport beats for notes and clicks alike:
    // downbeat accents coincide with the scored measure starts
    assert_eq!(note_beats, vec![0.0, 6.0]);
    assert_eq!(accent_beats, vec![0.0, 6.0, 12.0]);
}

#[test]
fn test_partial_start_computes_skipped_state() {
    let (transport, instrument, scheduler) = setup();

    // Mixed signatures and a tempo buried in a skipped measure
    let mut score = two_hand_score(4);
    score.measures[0].time_signature = Some(TimeSignature::three_four());
    score.measures[1].tempo = Some(Tempo::new(66.0));
    score.measures[2].time_signature = Some(TimeSignature::four_four());

    scheduler.play_score(&score, 3).unwrap();

    // Measures 1-2 contribute 3 beats each; playback starts at beat 6
    // with the inherited tempo from measure 2
    assert_eq!(transport.earliest_beat(), Some(6.0));
    assert_eq!(transport.tempo(), 66.0);

    transport.advance_to(20.0);
    assert!(instrument
        .triggered()
        .iter()
        .all(|(_, _, time, _)| *time >= 6.0));
}

#[test]
fn test_note_without_keys_does_not_abort_playback() {
    let (transport, instrument, scheduler) = setup();

    let mut score = Score::new("Broken", "");
    let mut measure = Measure::new(1);
    measure.staves.push(Staff::with_voices(
        Clef::Treble,
        vec![Voice::with_notes(
            "right",
            vec![
                Note::pitched(Vec::new(), NoteDuration::default(), 0.0),
                quarter("B4", 1.0),
                quarter("C5", 2.0),
            ],
        )],
    ));
    score.measures.push(measure);

    scheduler.play_score(&score, 1).unwrap();
    transport.advance_to(4.0);

    let triggers = instrument.triggered();
    assert_eq!(triggers.len(), 2);
    assert_eq!(triggers[0].2, 1.0);
    assert_eq!(triggers[1].2, 2.0);
}

#[test]
fn test_instrument_failure_does_not_stop_the_piece() {
    let (transport, instrument, scheduler) = setup();
    let score = two_hand_score(2);

    let events = Arc::new(Mutex::new(0usize));
    let events_clone = Arc::clone(&events);
    scheduler.on_note_play(move |_| {
        *events_clone.lock().unwrap() += 1;
    });

    *instrument.fail.lock().unwrap() = true;
    scheduler.play_score(&score, 1).unwrap();
    transport.advance_to(8.0);

    // Every trigger failed, yet the schedule ran to completion and
    // listeners heard every note
    assert_eq!(*events.lock().unwrap(), 6);
    assert!(scheduler.is_playing());
}

#[test]
fn test_rests_are_never_scheduled() {
    let (transport, instrument, scheduler) = setup();

    let mut score = Score::new("Rests", "");
    let mut measure = Measure::new(1);
    measure.staves.push(Staff::with_voices(
        Clef::Treble,
        vec![Voice::with_notes(
            "right",
            vec![
                Note::rest(NoteDuration::new(DurationValue::Half), 0.0),
                quarter("A4", 2.0),
            ],
        )],
    ));
    score.measures.push(measure);

    scheduler.play_score(&score, 1).unwrap();

    // One marker + one note
    assert_eq!(transport.pending_count(), 2);
    transport.advance_to(4.0);
    assert_eq!(instrument.trigger_count(), 1);
}

#[test]
fn test_volume_change_applies_to_queued_notes() {
    let (transport, instrument, scheduler) = setup();
    let score = two_hand_score(1);

    scheduler.play_score(&score, 1).unwrap();
    transport.advance_to(1.0);
    scheduler.set_voice_volume("right", 0.25);
    transport.advance_to(4.0);

    let late_right: Vec<_> = instrument
        .triggered()
        .into_iter()
        .filter(|(voice, _, time, _)| voice == "right" && *time > 1.0)
        .collect();
    assert_eq!(late_right.len(), 1);
    assert_eq!(late_right[0].3, 0.25);
}

#[test]
fn test_shared_mixer_across_schedulers() {
    use score_player::{Instrument, PlaybackScheduler, Transport, VirtualTransport, VoiceMixer};

    // Injected mixer: two schedulers, one mixing surface
    let mixer = Arc::new(VoiceMixer::new());
    let transport_a = Arc::new(VirtualTransport::new());
    let instrument_a = Arc::new(RecordingInstrument::default());
    let scheduler_a = PlaybackScheduler::with_mixer(
        Arc::clone(&transport_a) as Arc<dyn Transport>,
        Arc::clone(&instrument_a) as Arc<dyn Instrument>,
        Arc::clone(&mixer),
    );

    mixer.mute_voice("left");
    let score = two_hand_score(1);
    scheduler_a.play_score(&score, 1).unwrap();
    transport_a.advance_to(4.0);

    assert!(instrument_a
        .triggered()
        .iter()
        .all(|(voice, ..)| voice != "left"));
}
