//! Shared configuration library for reelfeed.
//!
//! This crate owns the compiled defaults for the playback coordinator, the
//! serde models a config file maps onto, validation guard rails, and the
//! env/file loader. The coordinator and the simulation CLI both consume
//! [`CoordinatorConfig`] from here so there is a single source of truth for
//! thresholds, timings, and limits.

pub mod constants;
pub mod loader;
pub mod models;
pub mod validation;

pub use loader::ConfigSource;
pub use models::axis::{ArbitrationPolicy, AxisConfig, ScrollEstimate};
pub use models::playback::PlaybackConfig;
pub use models::prefetch::PrefetchConfig;
pub use models::{CoordinatorConfig, WatchCacheConfig};
pub use validation::ConfigError;
