// Voice mixer - per-voice mute/solo/volume state
// Consulted at schedule time as an optimization and again at trigger time

use crate::score::VoiceId;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct MixerState {
    muted: HashSet<VoiceId>,
    volumes: HashMap<VoiceId, f64>,
    soloed: Option<VoiceId>,
}

/// Shared mute/solo/volume state for every voice in a session.
///
/// Injected into the scheduler at construction so multiple scheduler
/// instances never interfere through hidden globals. All methods take
/// `&self`; the mixer is mutated live while notes are in flight, which is
/// why trigger callbacks must call `effective_level` again at fire time
/// instead of trusting the level they were scheduled under.
#[derive(Debug, Default)]
pub struct VoiceMixer {
    state: Mutex<MixerState>,
}

impl VoiceMixer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MixerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mute_voice(&self, voice_id: &str) {
        self.lock().muted.insert(voice_id.to_string());
    }

    pub fn unmute_voice(&self, voice_id: &str) {
        self.lock().muted.remove(voice_id);
    }

    pub fn toggle_mute(&self, voice_id: &str) {
        let mut state = self.lock();
        if !state.muted.remove(voice_id) {
            state.muted.insert(voice_id.to_string());
        }
    }

    pub fn is_muted(&self, voice_id: &str) -> bool {
        self.lock().muted.contains(voice_id)
    }

    /// Solo is exclusive: a new solo silently replaces any previous one
    pub fn solo_voice(&self, voice_id: &str) {
        self.lock().soloed = Some(voice_id.to_string());
    }

    /// Return to muted-set semantics
    pub fn clear_solo(&self) {
        self.lock().soloed = None;
    }

    pub fn soloed_voice(&self) -> Option<VoiceId> {
        self.lock().soloed.clone()
    }

    /// Set a voice's volume; out-of-range values are clamped to [0, 1]
    pub fn set_voice_volume(&self, voice_id: &str, volume: f64) {
        let clamped = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.lock().volumes.insert(voice_id.to_string(), clamped);
    }

    /// A voice with no explicit volume plays at full level
    pub fn volume(&self, voice_id: &str) -> f64 {
        self.lock().volumes.get(voice_id).copied().unwrap_or(1.0)
    }

    /// Should the voice sound right now: the solo wins when set, otherwise
    /// anything outside the muted set is audible
    pub fn is_audible(&self, voice_id: &str) -> bool {
        let state = self.lock();
        match &state.soloed {
            Some(solo) => solo == voice_id,
            None => !state.muted.contains(voice_id),
        }
    }

    /// Gain to apply at trigger time: the voice's volume, or 0 if inaudible
    pub fn effective_level(&self, voice_id: &str) -> f64 {
        let state = self.lock();
        let audible = match &state.soloed {
            Some(solo) => solo == voice_id,
            None => !state.muted.contains(voice_id),
        };
        if audible {
            state.volumes.get(voice_id).copied().unwrap_or(1.0)
        } else {
            0.0
        }
    }

    /// Drop all mute/solo/volume state (used by dispose)
    pub fn reset(&self) {
        let mut state = self.lock();
        state.muted.clear();
        state.volumes.clear();
        state.soloed = None;
    }
}
