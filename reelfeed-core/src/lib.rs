//! # Reelfeed Core
//!
//! Playback coordination for a vertically scrolling feed of posts, each
//! holding a horizontally scrolling carousel of videos. Exactly zero or one
//! video across the whole feed is active at any time.
//!
//! ## Overview
//!
//! - **Active window**: per-axis resolvers turn viewability and scroll
//!   callbacks from a virtualized list into one debounced active index
//! - **Playback**: a lifecycle controller per mounted slot drives load,
//!   play, pause, bounded retry and release with a grace window
//! - **Prefetch**: best-effort ranged probes for upcoming videos, issued in
//!   fixed-size concurrent groups
//! - **Watch cache**: bounded in-memory watch history with oldest-first
//!   eviction
//! - **Orchestrator**: composes both axes into the single active slot
//!
//! ## Architecture
//!
//! Coordinator logic is synchronous and event driven. Every entry point
//! takes the current [`std::time::Instant`], and deadlines (debounce,
//! retry, autoplay, unload grace) fire from `tick`. Hosts either drive a
//! [`FeedOrchestrator`] directly or hand it to [`spawn_feed_runtime`],
//! which ticks it from a tokio task. Network probes run on their own task
//! behind a [`PrefetchHandle`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! use reelfeed_config::CoordinatorConfig;
//! use reelfeed_core::{
//!     FeedCollaborators, FeedOrchestrator, LoadGeneration, PlayerBackend,
//!     PlayerFactory, PrefetchHandle, TracingAnalyticsSink, ViewableItem,
//!     WatchCache,
//! };
//! use reelfeed_model::{SourceLocator, VideoItem};
//!
//! /// Bridges slots to the host's media player.
//! #[derive(Debug)]
//! struct HostPlayers;
//!
//! #[derive(Debug)]
//! struct HostPlayer;
//!
//! impl PlayerFactory for HostPlayers {
//!     fn create(&mut self, _video: &VideoItem) -> Box<dyn PlayerBackend> {
//!         Box::new(HostPlayer)
//!     }
//! }
//!
//! impl PlayerBackend for HostPlayer {
//!     fn load(&mut self, _source: &SourceLocator, _generation: LoadGeneration) {}
//!     fn play(&mut self) {}
//!     fn pause(&mut self) {}
//!     fn replay(&mut self, _from_position: f64, _generation: LoadGeneration) {}
//!     fn unload(&mut self) {}
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CoordinatorConfig::default();
//! let (prefetch, _requests) = PrefetchHandle::channel();
//! let mut feed = FeedOrchestrator::new(
//!     config.clone(),
//!     FeedCollaborators {
//!         watch_cache: Arc::new(WatchCache::from_config(&config.watch_cache)),
//!         analytics: Arc::new(TracingAnalyticsSink),
//!         players: Box::new(HostPlayers),
//!         prefetch,
//!     },
//! )?;
//!
//! // Host callbacks, stamped with the current instant.
//! feed.report_post_viewability(&[ViewableItem::new(0, 1.0)], Instant::now());
//! feed.tick(Instant::now());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod active_window;
pub mod analytics;
pub mod clock;
pub mod error;
pub mod orchestrator;
pub mod playback;
pub mod prefetch;
pub mod runtime;
#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;
pub mod timer;
pub mod watch_cache;

pub use active_window::{
    ActiveIndexChange, ActiveWindowResolver, ActiveWindowState, ChangeCause,
    ItemLayout, ItemMetrics, ViewableItem, VisibleItem, normalize_viewability,
};
pub use analytics::{
    AnalyticsEvent, AnalyticsSink, NoopAnalyticsSink, TracingAnalyticsSink,
    UnloadReason,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoordinatorError, Result};
pub use orchestrator::{FeedCollaborators, FeedOrchestrator, SlotKey, SlotView};
pub use playback::{
    FaultClass, LoadGeneration, PlaybackController, PlaybackState,
    PlayerBackend, PlayerEvent, PlayerEventKind, PlayerFactory, PlayerFault,
    SlotSnapshot,
};
pub use prefetch::{
    HttpProbe, NetworkProbe, PrefetchHandle, PrefetchOutcome, PrefetchRequest,
    PrefetchScheduler, ProbeError, ProbeResponse, start_prefetcher,
};
pub use runtime::{FeedCommand, FeedRuntimeHandle, spawn_feed_runtime};
pub use timer::CancelableTimer;
pub use watch_cache::{WatchCache, WatchCacheEntry, WatchStats};
