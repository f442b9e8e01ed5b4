//! Virtual-time session driver.
//!
//! Owns a [`FeedOrchestrator`] wired to simulated players and a manual
//! clock. Mounting follows the render window the way a virtualized list
//! would: every video of every post within `render_window_posts` of the
//! active post is mounted.

use anyhow::Context;
use reelfeed_config::CoordinatorConfig;
use reelfeed_core::timer::earliest;
use reelfeed_core::{
    Clock, CoordinatorError, FeedCollaborators, FeedOrchestrator, ManualClock,
    PlayerEvent, PlayerFault, PrefetchHandle, PrefetchRequest, SlotKey,
    SlotView, ViewableItem, WatchCache, WatchStats,
};
use reelfeed_model::VideoId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

use crate::analytics::CountingSink;
use crate::feed::{FeedShape, synthetic_feed};
use crate::player::{EventQueue, ScheduledEvent, SimPlayerFactory};
use crate::script::{Script, Step, Visible, fault};

/// Upper bound on delivery rounds at a single instant.
const MAX_SETTLE_ROUNDS: usize = 10_000;

pub const DEFAULT_LATENCY_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub shape: FeedShape,
    pub player_latency: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            shape: FeedShape::default(),
            player_latency: Duration::from_millis(DEFAULT_LATENCY_MS),
        }
    }
}

impl SessionOptions {
    /// Options from a script's `[feed]` table, with explicit overrides on
    /// top.
    pub fn resolve(
        script: &Script,
        posts: Option<usize>,
        videos_per_post: Option<usize>,
        latency_ms: Option<u64>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            shape: FeedShape {
                posts: posts
                    .or(script.feed.posts)
                    .unwrap_or(defaults.shape.posts),
                videos_per_post: videos_per_post
                    .or(script.feed.videos_per_post)
                    .unwrap_or(defaults.shape.videos_per_post),
            },
            player_latency: latency_ms
                .or(script.feed.player_latency_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.player_latency),
        }
    }
}

/// Final state of a replayed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub elapsed_ms: u64,
    pub steps_applied: usize,
    pub rejected_steps: usize,
    pub active_slot: Option<SlotKey>,
    pub analytics: BTreeMap<&'static str, usize>,
    pub prefetched: Vec<String>,
    pub watch: WatchStats,
    pub slots: Vec<SlotView>,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "session: {} steps ({} rejected) over {} ms",
            self.steps_applied, self.rejected_steps, self.elapsed_ms
        )?;
        match self.active_slot {
            Some(key) => writeln!(f, "active slot: {key}")?,
            None => writeln!(f, "active slot: none")?,
        }

        writeln!(f, "analytics:")?;
        for (name, count) in &self.analytics {
            writeln!(f, "  {name:<20} {count}")?;
        }

        writeln!(f, "prefetched ({}):", self.prefetched.len())?;
        for locator in &self.prefetched {
            writeln!(f, "  {locator}")?;
        }

        writeln!(f, "mounted slots:")?;
        for view in &self.slots {
            let mut flags = Vec::new();
            if view.is_active {
                flags.push("active");
            }
            if view.is_fully_watched {
                flags.push("fully watched");
            } else if view.has_been_watched {
                flags.push("watched");
            }
            if view.show_error {
                flags.push("error");
            }
            if view.show_spinner {
                flags.push("spinner");
            }
            writeln!(
                f,
                "  {:<22} {:<15} {}",
                view.key.to_string(),
                view.state.as_str(),
                flags.join(", ")
            )?;
        }

        write!(
            f,
            "watch stats: {} entries, {} fully watched, {} plays",
            self.watch.total_entries,
            self.watch.fully_watched,
            self.watch.total_watch_count
        )
    }
}

#[derive(Debug)]
pub struct Session {
    orchestrator: FeedOrchestrator,
    clock: ManualClock,
    started_at: Instant,
    queue: EventQueue,
    analytics: Arc<CountingSink>,
    prefetch_rx: UnboundedReceiver<PrefetchRequest>,
    prefetched: Vec<PrefetchRequest>,
    slots_by_video: HashMap<VideoId, SlotKey>,
    steps_applied: usize,
    rejected_steps: usize,
}

impl Session {
    pub fn new(
        config: CoordinatorConfig,
        options: SessionOptions,
    ) -> anyhow::Result<Self> {
        let clock = ManualClock::new();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let queue = EventQueue::new();
        let analytics = Arc::new(CountingSink::new());
        let (prefetch, prefetch_rx) = PrefetchHandle::channel();

        let watch_cache = Arc::new(WatchCache::with_clock(
            config.watch_cache.capacity,
            config.watch_cache.fully_watched_ratio,
            shared_clock.clone(),
        ));
        let players = SimPlayerFactory::new(
            options.player_latency,
            shared_clock,
            queue.clone(),
        );

        let mut orchestrator = FeedOrchestrator::new(
            config,
            FeedCollaborators {
                watch_cache,
                analytics: analytics.clone(),
                players: Box::new(players),
                prefetch,
            },
        )
        .context("coordinator refused configuration")?;

        let posts = synthetic_feed(options.shape)
            .context("failed to generate synthetic feed")?;
        let slots_by_video = posts
            .iter()
            .enumerate()
            .flat_map(|(post_index, post)| {
                post.videos().iter().enumerate().map(move |(video_index, video)| {
                    (video.id, SlotKey::new(post_index, video_index))
                })
            })
            .collect();

        let started_at = clock.now();
        orchestrator.append_posts(posts, started_at);
        info!(
            posts = options.shape.posts,
            videos_per_post = options.shape.videos_per_post,
            latency_ms = options.player_latency.as_millis() as u64,
            "simulated feed ready"
        );

        let mut session = Self {
            orchestrator,
            clock,
            started_at,
            queue,
            analytics,
            prefetch_rx,
            prefetched: Vec::new(),
            slots_by_video,
            steps_applied: 0,
            rejected_steps: 0,
        };
        session.settle();
        Ok(session)
    }

    pub fn orchestrator(&self) -> &FeedOrchestrator {
        &self.orchestrator
    }

    pub fn analytics(&self) -> &CountingSink {
        &self.analytics
    }

    pub fn prefetched(&self) -> &[PrefetchRequest] {
        &self.prefetched
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.started_at)
    }

    /// Apply every step. A step the coordinator rejects is logged and
    /// counted, and the replay carries on.
    pub fn run(&mut self, script: &Script) {
        for (index, step) in script.steps.iter().enumerate() {
            if let Err(err) = self.apply(step) {
                self.rejected_steps += 1;
                warn!(step = index, action = step.action(), error = %err, "step rejected");
            }
        }
    }

    pub fn apply(&mut self, step: &Step) -> Result<(), CoordinatorError> {
        let now = self.now();
        debug!(
            action = step.action(),
            at_ms = self.elapsed().as_millis() as u64,
            "applying step"
        );

        let result = match step {
            Step::PostViewability { items } => {
                let items = viewable(items);
                self.orchestrator.report_post_viewability(&items, now);
                Ok(())
            }
            Step::CarouselViewability { post, items } => {
                let items = viewable(items);
                self.orchestrator
                    .report_carousel_viewability(*post, &items, now)
            }
            Step::PostScroll { offset } => {
                self.orchestrator.report_post_scroll(*offset, now);
                Ok(())
            }
            Step::CarouselScroll { post, offset } => {
                self.orchestrator.report_carousel_scroll(*post, *offset, now)
            }
            Step::AdvanceMs { ms } => {
                self.advance(Duration::from_millis(*ms));
                Ok(())
            }
            Step::PlayerFail {
                post,
                video,
                kind,
                message,
            } => self.fail_slot(
                SlotKey::new(*post, *video),
                fault(*kind, message.as_deref()),
            ),
            Step::TogglePause { post, video } => {
                self.orchestrator.toggle_pause(SlotKey::new(*post, *video))
            }
        };

        self.steps_applied += 1;
        self.settle();
        result
    }

    /// Move virtual time forward by `by`, firing every deadline and player
    /// completion on the way in order.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now() + by;
        loop {
            self.settle();
            let now = self.now();
            let next = earliest([
                self.orchestrator.next_deadline(),
                self.queue.next_due(),
            ]);
            match next {
                Some(at) if at > now && at <= target => {
                    self.clock.advance(at - now);
                }
                _ => break,
            }
        }

        let now = self.now();
        if target > now {
            self.clock.advance(target - now);
        }
        self.settle();
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            elapsed_ms: self.elapsed().as_millis() as u64,
            steps_applied: self.steps_applied,
            rejected_steps: self.rejected_steps,
            active_slot: self.orchestrator.active_slot(),
            analytics: self.analytics.counts(),
            prefetched: self
                .prefetched
                .iter()
                .map(|request| request.locator.to_string())
                .collect(),
            watch: self.orchestrator.watch_cache().stats(),
            slots: self.orchestrator.slot_views(),
        }
    }

    fn fail_slot(
        &mut self,
        key: SlotKey,
        fault: PlayerFault,
    ) -> Result<(), CoordinatorError> {
        let slot = self
            .orchestrator
            .slot(key)
            .ok_or(CoordinatorError::UnknownSlot(key))?;
        let generation = slot.generation();
        self.queue.cancel(slot.video_id());

        let now = self.now();
        self.orchestrator.handle_player_event(
            key,
            PlayerEvent::failed(generation, fault),
            now,
        )
    }

    /// Deliver everything due now, fire due timers, and keep the mounted
    /// set aligned with the render window until nothing is left to do.
    fn settle(&mut self) {
        let now = self.now();
        for _ in 0..MAX_SETTLE_ROUNDS {
            self.orchestrator.tick(now);
            self.sync_mounts(now);
            self.drain_prefetch();

            let Some(scheduled) = self.queue.pop_due(now) else {
                return;
            };
            self.deliver(scheduled, now);
        }
        warn!(
            pending = self.queue.len(),
            "player events still due after settle limit"
        );
    }

    fn deliver(&mut self, scheduled: ScheduledEvent, now: Instant) {
        let Some(key) = self.slots_by_video.get(&scheduled.video).copied()
        else {
            trace!(video = %scheduled.video, "event for unknown video dropped");
            return;
        };
        if self.orchestrator.slot(key).is_none() {
            trace!(slot = %key, "event for unmounted slot dropped");
            return;
        }
        if let Err(err) =
            self.orchestrator
                .handle_player_event(key, scheduled.event, now)
        {
            debug!(slot = %key, error = %err, "player event rejected");
        }
    }

    fn sync_mounts(&mut self, now: Instant) {
        let post_count = self.orchestrator.posts().len();
        if post_count == 0 {
            return;
        }
        let centre = self.orchestrator.post_state().active.unwrap_or(0);
        let window = self.orchestrator.config().render_window_posts;
        let first = centre.saturating_sub(window);
        let last = centre.saturating_add(window).min(post_count - 1);

        for post_index in first..=last {
            let video_count = self.orchestrator.posts()[post_index].video_count();
            for video_index in 0..video_count {
                let key = SlotKey::new(post_index, video_index);
                if self.orchestrator.slot(key).is_some() {
                    continue;
                }
                if let Err(err) = self.orchestrator.mount_slot(key, now) {
                    warn!(slot = %key, error = %err, "mount failed");
                }
            }
        }
    }

    fn drain_prefetch(&mut self) {
        while let Ok(request) = self.prefetch_rx.try_recv() {
            info!(video = %request.video_id, locator = %request.locator, "prefetch requested");
            self.prefetched.push(request);
        }
    }
}

fn viewable(items: &[Visible]) -> Vec<ViewableItem> {
    items.iter().copied().map(ViewableItem::from).collect()
}
