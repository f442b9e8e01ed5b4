use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::playback;

/// Lifecycle tuning for every mounted video slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Automatic retries allowed per activation before the slot is
    /// considered exhausted.
    pub max_retries: u32,
    /// Delay between a fault and its retry.
    pub retry_delay_ms: u64,
    /// Time a deactivated slot keeps its player before releasing it. Rapid
    /// re-activation inside this window resumes without a reload.
    pub unload_grace_ms: u64,
    /// Delay between a slot becoming ready and the play command. Zero plays
    /// immediately.
    pub autoplay_delay_ms: u64,
    /// When true, re-activating a slot inside the grace window clears a
    /// manual pause and resumes playback; when false the slot stays paused
    /// until the user taps again.
    pub resume_manual_pause_on_reactivation: bool,
    /// Restart from the beginning when a video finishes.
    pub loop_playback: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_retries: playback::MAX_RETRIES,
            retry_delay_ms: playback::RETRY_DELAY_MS,
            unload_grace_ms: playback::UNLOAD_GRACE_MS,
            autoplay_delay_ms: playback::AUTOPLAY_DELAY_MS,
            resume_manual_pause_on_reactivation: true,
            loop_playback: true,
        }
    }
}

impl PlaybackConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn unload_grace(&self) -> Duration {
        Duration::from_millis(self.unload_grace_ms)
    }

    pub fn autoplay_delay(&self) -> Duration {
        Duration::from_millis(self.autoplay_delay_ms)
    }
}
