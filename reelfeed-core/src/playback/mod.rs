//! Per-slot playback lifecycle.

pub mod controller;
pub mod player;
pub mod state;

pub use controller::PlaybackController;
pub use player::{
    FaultClass, PlayerBackend, PlayerEvent, PlayerEventKind, PlayerFactory,
    PlayerFault,
};
pub use state::{LoadGeneration, PlaybackState, SlotSnapshot};
