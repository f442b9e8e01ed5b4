//! Compiled defaults for every tunable the coordinator exposes.

pub mod viewability {
    /// Fraction of a post that must be on screen before it can become active.
    pub const OUTER_THRESHOLD: f32 = 0.8;
    /// Fraction of a carousel video that must be on screen to become active.
    pub const INNER_THRESHOLD: f32 = 0.5;
    /// Window a scroll-derived candidate must persist before it is committed.
    pub const DEBOUNCE_MS: u64 = 175;
}

pub mod layout {
    /// Estimated height of a post row in the vertical feed (px).
    pub const POST_EXTENT: f32 = 640.0;
    /// Estimated width of a carousel page (px).
    pub const VIDEO_EXTENT: f32 = 390.0;
    pub const FEED_VIEWPORT: f32 = 844.0;
    pub const CAROUSEL_VIEWPORT: f32 = 390.0;
    /// Posts kept mounted on each side of the active post.
    pub const RENDER_WINDOW_POSTS: usize = 2;
}

pub mod prefetch {
    pub const TIMEOUT_MS: u64 = 5_000;
    pub const CONCURRENCY: usize = 3;
    pub const LOOKAHEAD: usize = 1;
    pub const PROBE_RANGE_BYTES: u64 = 1_024;
}

pub mod playback {
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_DELAY_MS: u64 = 2_000;
    pub const UNLOAD_GRACE_MS: u64 = 800;
    pub const AUTOPLAY_DELAY_MS: u64 = 0;
}

pub mod watch_cache {
    pub const CAPACITY: usize = 100;
    pub const FULLY_WATCHED_RATIO: f64 = 0.9;
}

/// Environment variable pointing at a TOML or JSON config file.
pub const CONFIG_PATH_ENV: &str = "REELFEED_CONFIG_PATH";
/// Environment variable carrying an inline JSON config.
pub const CONFIG_JSON_ENV: &str = "REELFEED_CONFIG_JSON";
