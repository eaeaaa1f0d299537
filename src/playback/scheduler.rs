// Playback scheduler - the core orchestrator
// Walks a score, schedules every onset/marker/tempo change on the
// transport, and guarantees cleanup of every handle on stop

use crate::playback::listeners::{ListenerId, ListenerRegistry, MeasureChangeEvent, NotePlayEvent};
use crate::playback::metronome::Metronome;
use crate::playback::mixer::VoiceMixer;
use crate::playback::registry::EventRegistry;
use crate::playback::timeline::{Tempo, TempoSource, TimeSignature, TimelineMapper};
use crate::score::{Note, Score};
use crate::transport::{Instrument, Transport, TransportError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Playback error types
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The audio clock could not be started; no playback can proceed
    #[error("audio clock unavailable: {0}")]
    ClockUnavailable(#[from] TransportError),

    /// The scheduler was disposed and must not be reused
    #[error("scheduler has been disposed")]
    Disposed,
}

/// Schedules polyphonic score playback on an external beat transport.
///
/// `play_score` returns as soon as every event is enqueued; callbacks fire
/// later on the transport's execution context. Mute/solo/volume are
/// re-checked inside each trigger callback, so mixer changes issued after
/// scheduling still silence or restore notes that have not fired yet.
/// Every handle goes through one `EventRegistry`, and `stop_playback` is
/// the only path by which scheduled work is torn down.
pub struct PlaybackScheduler {
    transport: Arc<dyn Transport>,
    instrument: Arc<dyn Instrument>,
    mixer: Arc<VoiceMixer>,
    listeners: Arc<ListenerRegistry>,
    registry: Arc<EventRegistry>,
    metronome: Metronome,
    tempo: Arc<TempoSource>,
    playing: AtomicBool,
    paused: AtomicBool,
    disposed: AtomicBool,
}

impl PlaybackScheduler {
    pub fn new(transport: Arc<dyn Transport>, instrument: Arc<dyn Instrument>) -> Self {
        Self::with_mixer(transport, instrument, Arc::new(VoiceMixer::new()))
    }

    /// Construct with an injected mixer (shared with other controllers)
    pub fn with_mixer(
        transport: Arc<dyn Transport>,
        instrument: Arc<dyn Instrument>,
        mixer: Arc<VoiceMixer>,
    ) -> Self {
        let tempo = Arc::new(TempoSource::new());
        let metronome = Metronome::with_tempo(
            Arc::clone(&transport),
            Arc::clone(&instrument),
            Arc::clone(&tempo),
        );
        Self {
            transport,
            instrument,
            mixer,
            listeners: Arc::new(ListenerRegistry::new()),
            registry: Arc::new(EventRegistry::new()),
            metronome,
            tempo,
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Play the whole score from `start_measure` (1-based).
    ///
    /// Any prior playback is stopped first; measures before `start_measure`
    /// contribute only their beat lengths and tempo/signature state, never
    /// scheduled events.
    pub fn play_score(&self, score: &Score, start_measure: u32) -> Result<(), PlaybackError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(PlaybackError::Disposed);
        }

        self.stop_playback();

        let mapper = TimelineMapper::new(score);
        let start_index = (start_measure.max(1) - 1) as usize;

        // Tempo in effect at the first played measure
        let initial_bpm = mapper.effective_tempo(start_index).bpm();
        self.transport
            .set_tempo(self.tempo.set_base_bpm(initial_bpm));

        let mut current_bpm = initial_bpm;
        for (index, measure) in score.measures.iter().enumerate().skip(start_index) {
            let measure_beat = mapper.measure_start_beat(index);

            self.schedule_measure_marker(measure.number, measure_beat);

            let effective_bpm = mapper.effective_tempo(index).bpm();
            if index > start_index && effective_bpm != current_bpm {
                current_bpm = effective_bpm;
                self.schedule_tempo_change(effective_bpm, measure_beat);
            }

            for staff in &measure.staves {
                for voice in &staff.voices {
                    for note in &voice.notes {
                        let Note::Pitched {
                            keys,
                            duration,
                            time,
                        } = note
                        else {
                            continue;
                        };
                        if keys.is_empty() {
                            log::warn!(
                                "skipping pitched note without keys (measure {}, voice {})",
                                measure.number,
                                voice.id
                            );
                            continue;
                        }

                        self.schedule_note(
                            &voice.id,
                            keys.clone(),
                            *duration,
                            mapper.absolute_beat(index, *time),
                        );
                    }
                }
            }
        }

        self.transport.seek(mapper.measure_start_beat(start_index));
        self.transport.start()?;
        self.playing.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Play a single voice by delegating to `play_score` on a filtered
    /// copy of the score, so voice-only playback reuses every scheduling
    /// rule instead of duplicating them
    pub fn play_voice(
        &self,
        score: &Score,
        voice_id: &str,
        start_measure: u32,
    ) -> Result<(), PlaybackError> {
        let filtered = score.filter_voice(voice_id);
        self.play_score(&filtered, start_measure)
    }

    fn schedule_measure_marker(&self, measure_number: u32, beat: f64) {
        let listeners = Arc::clone(&self.listeners);
        let handle = self.transport.schedule(
            beat,
            Box::new(move |fired_at| {
                listeners.notify_measure_change(&MeasureChangeEvent {
                    measure_number,
                    time: fired_at,
                });
            }),
        );
        self.registry.register(handle);
    }

    fn schedule_tempo_change(&self, bpm: f64, beat: f64) {
        let transport = Arc::clone(&self.transport);
        let tempo = Arc::clone(&self.tempo);
        let handle = self.transport.schedule(
            beat,
            Box::new(move |_| {
                transport.set_tempo(tempo.set_base_bpm(bpm));
            }),
        );
        self.registry.register(handle);
    }

    fn schedule_note(
        &self,
        voice_id: &str,
        keys: Vec<String>,
        duration: crate::score::NoteDuration,
        beat: f64,
    ) {
        let mixer = Arc::clone(&self.mixer);
        let instrument = Arc::clone(&self.instrument);
        let listeners = Arc::clone(&self.listeners);
        let voice_id = voice_id.to_string();

        let handle = self.transport.schedule(
            beat,
            Box::new(move |fired_at| {
                // Trigger-time check: the mixer may have changed since this
                // note was enqueued
                let level = mixer.effective_level(&voice_id);
                if level > 0.0 {
                    if let Err(err) =
                        instrument.trigger(&voice_id, &keys, duration, fired_at, level)
                    {
                        log::warn!(
                            "trigger failed for voice {voice_id} at beat {fired_at}: {err}"
                        );
                    }
                }
                // Suppressed notes still reach listeners (velocity 0) so
                // cursor-tracking UIs stay in sync
                listeners.notify_note_play(&NotePlayEvent {
                    pitches: keys.clone(),
                    voice_id: voice_id.clone(),
                    duration,
                    time: fired_at,
                    velocity: level,
                });
            }),
        );
        self.registry.register(handle);
    }

    /// Stop playback and cancel every outstanding handle.
    /// Safe to call repeatedly and when nothing is playing.
    pub fn stop_playback(&self) {
        // A running metronome keeps the clock alive; its tick chain is
        // swept by the global cancel below and rebuilt afterwards
        let metronome_running = self.metronome.is_running();
        if !metronome_running {
            self.transport.stop();
        }

        self.registry.clear_all(&*self.transport);

        if metronome_running {
            self.metronome.resync();
        }

        self.playing.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Halt the clock, keeping every scheduled event for `resume`.
    /// A running metronome keeps the clock alive (it is not score
    /// playback), so the halt takes effect once the metronome stops.
    pub fn pause(&self) {
        if self.playing.load(Ordering::SeqCst) && !self.paused.load(Ordering::SeqCst) {
            if !self.metronome.is_running() {
                self.transport.stop();
            }
            self.paused.store(true, Ordering::SeqCst);
        }
    }

    pub fn resume(&self) -> Result<(), PlaybackError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(PlaybackError::Disposed);
        }
        if self.paused.load(Ordering::SeqCst) {
            self.transport.start()?;
            self.paused.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Practice-speed multiplier, clamped to [0.25, 4.0]. Scales only the
    /// transport's beats-to-seconds conversion; beat positions are
    /// untouched, and mid-score tempo changes keep honoring it.
    pub fn set_playback_speed(&self, multiplier: f64) {
        let clamped = if multiplier.is_finite() {
            multiplier.clamp(0.25, 4.0)
        } else {
            1.0
        };
        self.transport.set_tempo(self.tempo.set_speed(clamped));
    }

    pub fn playback_speed(&self) -> f64 {
        self.tempo.speed()
    }

    // ----- mixer surface -----

    pub fn mixer(&self) -> &Arc<VoiceMixer> {
        &self.mixer
    }

    pub fn mute_voice(&self, voice_id: &str) {
        self.mixer.mute_voice(voice_id);
    }

    pub fn unmute_voice(&self, voice_id: &str) {
        self.mixer.unmute_voice(voice_id);
    }

    pub fn toggle_mute(&self, voice_id: &str) {
        self.mixer.toggle_mute(voice_id);
    }

    pub fn solo_voice(&self, voice_id: &str) {
        self.mixer.solo_voice(voice_id);
    }

    pub fn clear_solo(&self) {
        self.mixer.clear_solo();
    }

    pub fn set_voice_volume(&self, voice_id: &str, volume: f64) {
        self.mixer.set_voice_volume(voice_id, volume);
    }

    // ----- metronome surface -----

    pub fn start_metronome(
        &self,
        signature: TimeSignature,
        tempo: Tempo,
    ) -> Result<(), PlaybackError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(PlaybackError::Disposed);
        }
        self.metronome.start(signature, tempo)?;
        Ok(())
    }

    pub fn stop_metronome(&self) {
        self.metronome.stop();
    }

    pub fn is_metronome_running(&self) -> bool {
        self.metronome.is_running()
    }

    // ----- listener surface -----

    pub fn on_note_play<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&NotePlayEvent) + Send + Sync + 'static,
    {
        self.listeners.on_note_play(callback)
    }

    pub fn on_measure_change<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&MeasureChangeEvent) + Send + Sync + 'static,
    {
        self.listeners.on_measure_change(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.unsubscribe(id);
    }

    /// Handles currently tracked by the event registry
    pub fn outstanding_events(&self) -> usize {
        self.registry.len()
    }

    /// Tear down the whole session: playback, metronome, mixer settings,
    /// and all listeners. Idempotent; the instance must not be reused.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.metronome.stop();
        self.transport.stop();
        self.registry.clear_all(&*self.transport);
        self.mixer.reset();
        self.listeners.clear();
        self.playing.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }
}
