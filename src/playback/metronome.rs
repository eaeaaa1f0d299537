// Metronome - periodic click generator, independent of score playback
// Schedules a self-rechaining tick on the transport; beat 0 of each bar
// is accented

use crate::playback::registry::EventRegistry;
use crate::playback::timeline::{Tempo, TempoSource, TimeSignature};
use crate::score::{DurationValue, NoteDuration};
use crate::transport::{Instrument, Transport, TransportError};
use std::sync::{Arc, Mutex, PoisonError};

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on the first beat of a bar (downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

impl ClickType {
    /// Pitch of the click sound; accents sit a fifth above regular ticks
    pub fn pitch(&self) -> &'static str {
        match self {
            ClickType::Accent => "G5",
            ClickType::Regular => "C5",
        }
    }

    pub fn level(&self) -> f64 {
        match self {
            ClickType::Accent => 0.9,
            ClickType::Regular => 0.6,
        }
    }
}

/// Reserved voice id the metronome routes its clicks through
pub const METRONOME_VOICE: &str = "metronome";

#[derive(Debug)]
struct MetronomeState {
    running: bool,
    signature: TimeSignature,
    /// Beat within the bar for the next tick; 0 is the accented downbeat
    beat_in_bar: u32,
}

struct MetronomeInner {
    transport: Arc<dyn Transport>,
    instrument: Arc<dyn Instrument>,
    registry: EventRegistry,
    tempo: Arc<TempoSource>,
    state: Mutex<MetronomeState>,
}

impl MetronomeInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, MetronomeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue the tick at `beat` and track its handle
    fn schedule_tick(self: &Arc<Self>, beat: f64) {
        let chain = Arc::clone(self);
        let handle = self
            .transport
            .schedule(beat, Box::new(move |fired_at| chain.tick(fired_at)));
        self.registry.register(handle);
    }

    /// Sound one click and chain the next tick
    fn tick(self: &Arc<Self>, fired_at: f64) {
        let click = {
            let mut state = self.lock();
            if !state.running {
                return;
            }
            let click = if state.beat_in_bar == 0 {
                ClickType::Accent
            } else {
                ClickType::Regular
            };
            state.beat_in_bar = (state.beat_in_bar + 1) % state.signature.numerator as u32;
            click
        };

        if let Err(err) = self.instrument.trigger(
            METRONOME_VOICE,
            &[click.pitch().to_string()],
            NoteDuration::new(DurationValue::ThirtySecond),
            fired_at,
            click.level(),
        ) {
            log::warn!("metronome click failed at beat {fired_at}: {err}");
        }

        // One tick per transport beat, the unit the whole timeline counts
        // in; the transport tempo owns beats-to-seconds
        self.schedule_tick(fired_at + 1.0);
    }
}

/// Periodic click generator driven by the shared transport.
///
/// `Stopped → Running → Stopped`; starting from either state tears down
/// any existing tick chain first, so two metronomes can never run at once.
/// Tick handles live in the metronome's own registry and are canceled
/// without the global transport sweep, so stopping the metronome never
/// touches score-playback events.
pub struct Metronome {
    inner: Arc<MetronomeInner>,
}

impl Metronome {
    pub fn new(transport: Arc<dyn Transport>, instrument: Arc<dyn Instrument>) -> Self {
        Self::with_tempo(transport, instrument, Arc::new(TempoSource::new()))
    }

    /// Construct with a shared tempo source, so metronome tempo writes
    /// compose with the other writers on the same clock (score tempo,
    /// speed multiplier) instead of clobbering them
    pub fn with_tempo(
        transport: Arc<dyn Transport>,
        instrument: Arc<dyn Instrument>,
        tempo: Arc<TempoSource>,
    ) -> Self {
        Self {
            inner: Arc::new(MetronomeInner {
                transport,
                instrument,
                registry: EventRegistry::new(),
                tempo,
                state: Mutex::new(MetronomeState {
                    running: false,
                    signature: TimeSignature::default(),
                    beat_in_bar: 0,
                }),
            }),
        }
    }

    /// Start clicking, replacing any run already in progress.
    /// Starts the transport clock if it is not running yet.
    pub fn start(&self, signature: TimeSignature, tempo: Tempo) -> Result<(), TransportError> {
        self.inner.registry.cancel_tracked(&*self.inner.transport);
        {
            let mut state = self.inner.lock();
            state.running = true;
            state.signature = signature;
            state.beat_in_bar = 0;
        }

        self.inner
            .transport
            .set_tempo(self.inner.tempo.set_base_bpm(tempo.bpm()));
        self.inner.transport.start()?;
        self.inner.schedule_tick(self.inner.transport.now());
        Ok(())
    }

    /// Stop clicking; a stopped metronome stays stopped (no-op)
    pub fn stop(&self) {
        {
            let mut state = self.inner.lock();
            if !state.running {
                return;
            }
            state.running = false;
        }
        self.inner.registry.cancel_tracked(&*self.inner.transport);
    }

    /// Change the tick tempo going forward without restarting the click
    /// pattern; the accent position is preserved
    pub fn set_tempo(&self, tempo: Tempo) {
        if self.is_running() {
            self.inner
                .transport
                .set_tempo(self.inner.tempo.set_base_bpm(tempo.bpm()));
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Rebuild the tick chain after an external global cancel swept it
    /// away (the playback scheduler's stop path). The accent position is
    /// preserved; a stopped metronome is left alone.
    pub fn resync(&self) {
        if !self.inner.lock().running {
            return;
        }
        self.inner.registry.cancel_tracked(&*self.inner.transport);
        self.inner.schedule_tick(self.inner.transport.now() + 1.0);
    }
}
