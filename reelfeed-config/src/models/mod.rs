pub mod axis;
pub mod playback;
pub mod prefetch;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{layout, viewability, watch_cache};

use axis::{AxisConfig, ArbitrationPolicy};
use playback::PlaybackConfig;
use prefetch::PrefetchConfig;

/// Bounded watch-history settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchCacheConfig {
    /// Maximum number of entries kept before the oldest are evicted.
    pub capacity: usize,
    /// Fraction of the duration a position must reach for the video to
    /// count as fully watched.
    pub fully_watched_ratio: f64,
}

impl Default for WatchCacheConfig {
    fn default() -> Self {
        Self {
            capacity: watch_cache::CAPACITY,
            fully_watched_ratio: watch_cache::FULLY_WATCHED_RATIO,
        }
    }
}

/// Everything the playback coordinator can be tuned with. Every section is
/// optional in a config file; missing values fall back to the compiled
/// defaults in [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Vertical post feed.
    #[serde(
        default = "AxisConfig::outer_defaults",
        deserialize_with = "axis::outer"
    )]
    pub outer: AxisConfig,
    /// Horizontal carousel inside each post.
    #[serde(
        default = "AxisConfig::inner_defaults",
        deserialize_with = "axis::inner"
    )]
    pub inner: AxisConfig,
    /// Window a disagreeing scroll estimate must survive before it commits.
    pub debounce_ms: u64,
    pub arbitration: ArbitrationPolicy,
    pub prefetch: PrefetchConfig,
    pub playback: PlaybackConfig,
    pub watch_cache: WatchCacheConfig,
    /// Mounted slots further than this many posts from the active post are
    /// evicted.
    pub render_window_posts: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            outer: AxisConfig::outer_defaults(),
            inner: AxisConfig::inner_defaults(),
            debounce_ms: viewability::DEBOUNCE_MS,
            arbitration: ArbitrationPolicy::default(),
            prefetch: PrefetchConfig::default(),
            playback: PlaybackConfig::default(),
            watch_cache: WatchCacheConfig::default(),
            render_window_posts: layout::RENDER_WINDOW_POSTS,
        }
    }
}

impl CoordinatorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
