use serde::Serialize;
use std::fmt;

/// Lifecycle state of one mounted video slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Buffering,
    PausedByUser,
    Error,
    Unloading,
    Unloaded,
}

impl PlaybackState {
    /// States that hold or are acquiring an active player. At most one slot
    /// in the whole feed may be in one of these at steady state.
    pub fn is_engaged(&self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Ready | Self::Playing | Self::Buffering
        )
    }

    /// States during which the host shows a loading indicator.
    pub fn shows_spinner(&self) -> bool {
        matches!(self, Self::Loading | Self::Buffering)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Buffering => "buffering",
            Self::PausedByUser => "paused_by_user",
            Self::Error => "error",
            Self::Unloading => "unloading",
            Self::Unloaded => "unloaded",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag attached to every load attempt. Player callbacks carrying an older
/// generation belong to a superseded load and are discarded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize,
)]
pub struct LoadGeneration(u64);

impl LoadGeneration {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for LoadGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Point-in-time view of a controller, for rendering and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotSnapshot {
    pub state: PlaybackState,
    pub is_active: bool,
    pub buffering: bool,
    pub attempt: u32,
    /// Retries are used up for the current activation.
    pub exhausted: bool,
    pub manual_pause: bool,
    pub position: f64,
    pub duration: Option<f64>,
    pub generation: LoadGeneration,
}
