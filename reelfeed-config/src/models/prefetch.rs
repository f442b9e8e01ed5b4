use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::prefetch;

/// Best-effort warming of upcoming videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Budget for a single probe before it is aborted.
    pub timeout_ms: u64,
    /// Probes issued together in one group. The next group only starts once
    /// the previous one has fully settled.
    pub concurrency: usize,
    /// How many items ahead of the active index are warmed on each axis.
    pub lookahead: usize,
    /// Size of the partial-content request used as an existence probe.
    pub probe_range_bytes: u64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: prefetch::TIMEOUT_MS,
            concurrency: prefetch::CONCURRENCY,
            lookahead: prefetch::LOOKAHEAD,
            probe_range_bytes: prefetch::PROBE_RANGE_BYTES,
        }
    }
}

impl PrefetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `Range` header value covering the configured probe size.
    pub fn range_header(&self) -> String {
        format!("bytes=0-{}", self.probe_range_bytes.saturating_sub(1))
    }
}
