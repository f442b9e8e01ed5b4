//! Bounded in-memory watch history
//!
//! Remembers which videos have been played during the lifetime of the
//! process so the feed can show "watched" badges. Nothing is persisted.
//!
//! ## Key Concepts
//!
//! - **Watched**: the video has at least one recorded play-start
//! - **Fully watched**: a recorded position reached the configured ratio
//!   (0.9 by default) of the known duration. The flag never clears.
//! - **Eviction**: when an insert pushes the cache over capacity, the entries
//!   with the oldest `last_watched_at` are dropped until it fits again.
//!   Eviction ignores the fully-watched flag.
//!
//! ## Example
//!
//! ```
//! use reelfeed_core::watch_cache::WatchCache;
//! use reelfeed_model::VideoId;
//!
//! let cache = WatchCache::new(100, 0.9);
//! let video = VideoId::new();
//!
//! cache.mark_watched(video, 12.0, 15.0);
//! assert!(cache.has_been_watched(&video));
//! assert!(!cache.is_fully_watched(&video));
//!
//! cache.mark_watched(video, 15.0, 15.0);
//! assert!(cache.is_fully_watched(&video));
//! ```

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reelfeed_config::WatchCacheConfig;
use reelfeed_model::VideoId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};

/// Watch progress recorded for a single video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchCacheEntry {
    pub video_id: VideoId,
    pub last_watched_at: DateTime<Utc>,
    /// Number of recorded play-start/complete updates
    pub watch_count: u32,
    /// Last recorded playback position in seconds
    pub last_position: f64,
    /// Last known duration in seconds (0 when unknown)
    pub duration: f64,
    pub fully_watched: bool,
    /// Insertion order of the latest update; breaks timestamp ties
    #[serde(skip)]
    seq: u64,
}

/// Diagnostics summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchStats {
    pub total_entries: usize,
    pub fully_watched: usize,
    pub total_watch_count: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<VideoId, WatchCacheEntry>,
    next_seq: u64,
}

/// Process-wide watch history shared by every playback controller.
///
/// All access goes through an internal mutex, so controllers driven from
/// independent tasks can record progress concurrently.
#[derive(Debug)]
pub struct WatchCache {
    inner: Mutex<Inner>,
    capacity: usize,
    fully_watched_ratio: f64,
    clock: Arc<dyn Clock>,
}

impl WatchCache {
    pub fn new(capacity: usize, fully_watched_ratio: f64) -> Self {
        Self::with_clock(capacity, fully_watched_ratio, Arc::new(SystemClock))
    }

    pub fn from_config(config: &WatchCacheConfig) -> Self {
        Self::new(config.capacity, config.fully_watched_ratio)
    }

    pub fn with_clock(
        capacity: usize,
        fully_watched_ratio: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            fully_watched_ratio,
            clock,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Upsert progress for `video_id`.
    ///
    /// Bumps the watch count and timestamp, and sets the fully-watched flag
    /// once `position` reaches the configured share of a positive
    /// `duration`. A non-finite or non-positive duration keeps the last
    /// known one.
    pub fn mark_watched(&self, video_id: VideoId, position: f64, duration: f64) {
        let now = self.clock.utc_now();
        let position = if position.is_finite() {
            position.max(0.0)
        } else {
            0.0
        };
        let ratio = self.fully_watched_ratio;

        let mut inner = self.inner.lock();
        inner.next_seq += 1;
        let seq = inner.next_seq;

        let entry =
            inner
                .entries
                .entry(video_id)
                .or_insert_with(|| WatchCacheEntry {
                    video_id,
                    last_watched_at: now,
                    watch_count: 0,
                    last_position: 0.0,
                    duration: 0.0,
                    fully_watched: false,
                    seq,
                });

        if duration.is_finite() && duration > 0.0 {
            entry.duration = duration;
        }
        entry.last_watched_at = now;
        entry.seq = seq;
        entry.watch_count = entry.watch_count.saturating_add(1);
        entry.last_position = position;
        entry.fully_watched = entry.fully_watched
            || (entry.duration > 0.0 && position >= ratio * entry.duration);

        trace!(
            video = %video_id,
            position,
            fully_watched = entry.fully_watched,
            "watch progress recorded"
        );

        Self::evict_overflow(&mut inner, self.capacity);
    }

    fn evict_overflow(inner: &mut Inner, capacity: usize) {
        while inner.entries.len() > capacity {
            let oldest = inner
                .entries
                .values()
                .min_by(|a, b| {
                    a.last_watched_at
                        .cmp(&b.last_watched_at)
                        .then(a.seq.cmp(&b.seq))
                })
                .map(|entry| entry.video_id);

            let Some(oldest) = oldest else { break };
            inner.entries.remove(&oldest);
            debug!(video = %oldest, "evicted watch cache entry");
        }
    }

    pub fn has_been_watched(&self, video_id: &VideoId) -> bool {
        self.inner.lock().entries.contains_key(video_id)
    }

    pub fn is_fully_watched(&self, video_id: &VideoId) -> bool {
        self.inner
            .lock()
            .entries
            .get(video_id)
            .is_some_and(|entry| entry.fully_watched)
    }

    pub fn last_position(&self, video_id: &VideoId) -> f64 {
        self.inner
            .lock()
            .entries
            .get(video_id)
            .map_or(0.0, |entry| entry.last_position)
    }

    pub fn entry(&self, video_id: &VideoId) -> Option<WatchCacheEntry> {
        self.inner.lock().entries.get(video_id).cloned()
    }

    pub fn stats(&self) -> WatchStats {
        let inner = self.inner.lock();
        inner.entries.values().fold(
            WatchStats {
                total_entries: inner.entries.len(),
                ..WatchStats::default()
            },
            |mut stats, entry| {
                if entry.fully_watched {
                    stats.fully_watched += 1;
                }
                stats.total_watch_count += u64::from(entry.watch_count);
                stats
            },
        )
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }
}
