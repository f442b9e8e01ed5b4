//! Player collaborator seam.
//!
//! Commands go out synchronously; completions come back later as
//! [`PlayerEvent`]s tagged with the generation of the load that produced
//! them.

use reelfeed_model::{SourceLocator, VideoItem};
use std::fmt::{self, Debug};
use thiserror::Error;

use super::state::LoadGeneration;

/// Media player bound to a single slot.
pub trait PlayerBackend: Send + Debug {
    /// Start loading `source`. Completion arrives as `Loaded` or `Failed`.
    fn load(&mut self, source: &SourceLocator, generation: LoadGeneration);

    fn play(&mut self);

    fn pause(&mut self);

    /// Restart the loaded stream at `from_position` seconds.
    fn replay(&mut self, from_position: f64, generation: LoadGeneration);

    /// Release decoder and network resources.
    fn unload(&mut self);
}

/// Creates a player whenever a slot mounts.
pub trait PlayerFactory: Send + Debug {
    fn create(&mut self, video: &VideoItem) -> Box<dyn PlayerBackend>;
}

/// Fault class, deciding how a retry is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultClass {
    /// Source unreachable or unsupported; retried with a full reload.
    Load,
    /// Interrupted mid-playback; retried by replaying from the last position.
    Stream,
}

impl fmt::Display for FaultClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Stream => f.write_str("stream"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class} fault: {message}")]
pub struct PlayerFault {
    pub class: FaultClass,
    pub message: String,
}

impl PlayerFault {
    pub fn load(message: impl Into<String>) -> Self {
        Self {
            class: FaultClass::Load,
            message: message.into(),
        }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self {
            class: FaultClass::Stream,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEventKind {
    /// Source loaded. Carries the duration in seconds when known.
    Loaded { duration: Option<f64> },
    /// Transient stall. Not a fault.
    Buffering,
    Playing {
        position: f64,
        duration: Option<f64>,
    },
    Progress { position: f64 },
    Finished { duration: f64 },
    Failed(PlayerFault),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEvent {
    pub generation: LoadGeneration,
    pub kind: PlayerEventKind,
}

impl PlayerEvent {
    pub fn new(generation: LoadGeneration, kind: PlayerEventKind) -> Self {
        Self { generation, kind }
    }

    pub fn loaded(generation: LoadGeneration, duration: Option<f64>) -> Self {
        Self::new(generation, PlayerEventKind::Loaded { duration })
    }

    pub fn playing(generation: LoadGeneration, position: f64) -> Self {
        Self::new(
            generation,
            PlayerEventKind::Playing {
                position,
                duration: None,
            },
        )
    }

    pub fn failed(generation: LoadGeneration, fault: PlayerFault) -> Self {
        Self::new(generation, PlayerEventKind::Failed(fault))
    }
}
