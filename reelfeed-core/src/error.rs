use reelfeed_config::ConfigError;
use thiserror::Error;

use crate::orchestrator::SlotKey;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Invalid coordinator configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown post index: {0}")]
    UnknownPost(usize),

    #[error("Unknown slot: {0}")]
    UnknownSlot(SlotKey),

    #[error("Slot already mounted: {0}")]
    SlotAlreadyMounted(SlotKey),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
