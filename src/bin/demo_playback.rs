// Quick demonstration of the playback scheduler
// Run with: cargo run --bin demo_playback

use score_player::{
    Clef, DurationValue, Instrument, InstrumentError, Measure, Note, NoteDuration,
    PlaybackScheduler, Score, Staff, Tempo, TimeSignature, Transport, VirtualTransport, Voice,
};
use std::sync::Arc;

/// Console "instrument": prints every trigger instead of making sound
struct ConsoleInstrument;

impl Instrument for ConsoleInstrument {
    fn trigger(
        &self,
        voice_id: &str,
        pitches: &[String],
        duration: NoteDuration,
        time: f64,
        level: f64,
    ) -> Result<(), InstrumentError> {
        println!(
            "  beat {time:>5.2} | {voice_id:<10} | {:<12} | {duration} @ {level:.2}",
            pitches.join("+")
        );
        Ok(())
    }
}

fn demo_score() -> Score {
    let mut score = Score::new("Minuet Fragment", "Anon.");

    for number in 1..=4u32 {
        let mut measure = Measure::new(number);
        if number == 1 {
            measure.time_signature = Some(TimeSignature::three_four());
            measure.tempo = Some(Tempo::new(108.0));
        }
        if number == 3 {
            measure.tempo = Some(Tempo::new(88.0));
        }

        let right = Voice::with_notes(
            "right",
            vec![
                Note::pitched(
                    vec!["D5".to_string()],
                    NoteDuration::new(DurationValue::Quarter),
                    0.0,
                ),
                Note::pitched(
                    vec!["G4".to_string(), "B4".to_string()],
                    NoteDuration::new(DurationValue::Quarter),
                    1.0,
                ),
                Note::pitched(
                    vec!["A4".to_string()],
                    NoteDuration::new(DurationValue::Quarter),
                    2.0,
                ),
            ],
        );
        let left = Voice::with_notes(
            "left",
            vec![Note::pitched(
                vec!["G3".to_string()],
                NoteDuration::dotted(DurationValue::Half),
                0.0,
            )],
        );

        measure.staves.push(Staff::with_voices(Clef::Treble, vec![right]));
        measure.staves.push(Staff::with_voices(Clef::Bass, vec![left]));
        score.measures.push(measure);
    }

    score
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let transport = Arc::new(VirtualTransport::new());
    let scheduler = PlaybackScheduler::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::new(ConsoleInstrument),
    );

    let score = demo_score();
    println!("Playing \"{}\" ({} measures)", score.title, score.measures.len());

    scheduler.on_measure_change(|event| {
        println!("-- measure {} (beat {})", event.measure_number, event.time);
    });

    println!("\nFull score:");
    scheduler.play_score(&score, 1)?;
    transport.advance_to(12.0);

    println!("\nLeft hand only, from measure 3, right hand muted anyway:");
    scheduler.mute_voice("right");
    scheduler.play_voice(&score, "left", 3)?;
    transport.advance_to(12.0);

    scheduler.stop_playback();
    println!(
        "\nDone. Outstanding handles after stop: {}",
        scheduler.outstanding_events()
    );

    Ok(())
}
