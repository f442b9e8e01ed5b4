//! Feed orchestrator
//!
//! The only component that sees both axes. It owns the post resolver, one
//! carousel resolver per post, and the playback controller of every mounted
//! slot. Whenever either axis commits a new index it recomputes the single
//! globally active slot, deactivates every other slot before activating the
//! selected one, and queues lookahead prefetches.

pub mod slot;

pub use slot::{SlotKey, SlotView};

use reelfeed_config::CoordinatorConfig;
use reelfeed_model::PostItem;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::active_window::{
    ActiveIndexChange, ActiveWindowResolver, ActiveWindowState, ItemLayout,
    ItemMetrics, ViewableItem,
};
use crate::analytics::{AnalyticsSink, UnloadReason};
use crate::error::{CoordinatorError, Result};
use crate::playback::{
    PlaybackController, PlaybackState, PlayerEvent, PlayerFactory,
};
use crate::prefetch::{PrefetchHandle, PrefetchRequest};
use crate::timer::earliest;
use crate::watch_cache::WatchCache;

/// Collaborators injected into the orchestrator at startup.
#[derive(Debug)]
pub struct FeedCollaborators {
    pub watch_cache: Arc<WatchCache>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub players: Box<dyn PlayerFactory>,
    pub prefetch: PrefetchHandle,
}

#[derive(Debug)]
pub struct FeedOrchestrator {
    config: CoordinatorConfig,
    posts: Vec<PostItem>,
    outer: ActiveWindowResolver,
    inner: BTreeMap<usize, ActiveWindowResolver>,
    slots: BTreeMap<SlotKey, PlaybackController>,
    active_slot: Option<SlotKey>,
    watch_cache: Arc<WatchCache>,
    analytics: Arc<dyn AnalyticsSink>,
    players: Box<dyn PlayerFactory>,
    prefetch: PrefetchHandle,
    post_layout: ItemLayout,
    carousel_layout: ItemLayout,
    active_tx: watch::Sender<Option<SlotKey>>,
}

impl FeedOrchestrator {
    /// Build an orchestrator, refusing an invalid configuration.
    pub fn new(
        config: CoordinatorConfig,
        collaborators: FeedCollaborators,
    ) -> Result<Self> {
        config.validate()?;

        let outer = ActiveWindowResolver::new(
            "outer",
            config.outer,
            config.debounce(),
            config.arbitration,
        );
        let (active_tx, _) = watch::channel(None);

        Ok(Self {
            post_layout: ItemLayout::from_axis(&config.outer),
            carousel_layout: ItemLayout::from_axis(&config.inner),
            config,
            posts: Vec::new(),
            outer,
            inner: BTreeMap::new(),
            slots: BTreeMap::new(),
            active_slot: None,
            watch_cache: collaborators.watch_cache,
            analytics: collaborators.analytics,
            players: collaborators.players,
            prefetch: collaborators.prefetch,
            active_tx,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn posts(&self) -> &[PostItem] {
        &self.posts
    }

    pub fn watch_cache(&self) -> &Arc<WatchCache> {
        &self.watch_cache
    }

    /// Append a page of posts. Existing indices never move, so mounted slot
    /// keys stay valid.
    pub fn append_posts(
        &mut self,
        posts: impl IntoIterator<Item = PostItem>,
        now: Instant,
    ) -> usize {
        let before = self.posts.len();
        self.posts.extend(posts);
        let added = self.posts.len() - before;
        debug!(added, total = self.posts.len(), "posts appended");

        if let Some(change) = self.outer.set_item_count(self.posts.len()) {
            self.on_outer_change(change, now);
        }
        added
    }

    pub fn report_post_viewability(
        &mut self,
        items: &[ViewableItem],
        now: Instant,
    ) {
        if let Some(change) = self.outer.report_viewability(items, now) {
            self.on_outer_change(change, now);
        }
    }

    pub fn report_post_scroll(&mut self, offset: f32, now: Instant) {
        if let Some(change) = self.outer.report_scroll_offset(offset, now) {
            self.on_outer_change(change, now);
        }
    }

    pub fn report_carousel_viewability(
        &mut self,
        post_index: usize,
        items: &[ViewableItem],
        now: Instant,
    ) -> Result<()> {
        let change = self.carousel(post_index)?.report_viewability(items, now);
        if let Some(change) = change {
            self.on_inner_change(post_index, change, now);
        }
        Ok(())
    }

    pub fn report_carousel_scroll(
        &mut self,
        post_index: usize,
        offset: f32,
        now: Instant,
    ) -> Result<()> {
        let change = self
            .carousel(post_index)?
            .report_scroll_offset(offset, now);
        if let Some(change) = change {
            self.on_inner_change(post_index, change, now);
        }
        Ok(())
    }

    /// Fire due debounce commits and slot timers.
    pub fn tick(&mut self, now: Instant) {
        if let Some(change) = self.outer.tick(now) {
            self.on_outer_change(change, now);
        }

        let inner_changes: Vec<_> = self
            .inner
            .iter_mut()
            .filter_map(|(post, resolver)| {
                resolver.tick(now).map(|change| (*post, change))
            })
            .collect();
        for (post, change) in inner_changes {
            self.on_inner_change(post, change, now);
        }

        for slot in self.slots.values_mut() {
            slot.tick(now);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(
            std::iter::once(self.outer.next_deadline())
                .chain(self.inner.values().map(|r| r.next_deadline()))
                .chain(self.slots.values().map(|s| s.next_deadline())),
        )
    }

    /// Mount a slot for `key`. If it is the currently selected slot it is
    /// activated straight away.
    pub fn mount_slot(&mut self, key: SlotKey, now: Instant) -> Result<()> {
        if self.slots.contains_key(&key) {
            return Err(CoordinatorError::SlotAlreadyMounted(key));
        }
        let video = self
            .posts
            .get(key.post_index)
            .ok_or(CoordinatorError::UnknownPost(key.post_index))?
            .video(key.video_index)
            .ok_or(CoordinatorError::UnknownSlot(key))?
            .clone();

        let player = self.players.create(&video);
        let mut controller = PlaybackController::new(
            video,
            self.config.playback,
            player,
            self.watch_cache.clone(),
            self.analytics.clone(),
            now,
        );
        if self.active_slot == Some(key) {
            controller.set_active(true, now);
        }
        debug!(slot = %key, "slot mounted");
        self.slots.insert(key, controller);
        Ok(())
    }

    pub fn unmount_slot(&mut self, key: SlotKey) -> Result<()> {
        let mut controller = self
            .slots
            .remove(&key)
            .ok_or(CoordinatorError::UnknownSlot(key))?;
        controller.dispose(UnloadReason::Unmounted);
        debug!(slot = %key, "slot unmounted");
        Ok(())
    }

    pub fn handle_player_event(
        &mut self,
        key: SlotKey,
        event: PlayerEvent,
        now: Instant,
    ) -> Result<()> {
        self.slot_mut(key)?.handle_event(event, now);
        Ok(())
    }

    pub fn toggle_pause(&mut self, key: SlotKey) -> Result<()> {
        self.slot_mut(key)?.toggle_pause();
        Ok(())
    }

    /// The selected slot: active post combined with that post's active
    /// carousel index. It may not be mounted yet.
    pub fn active_slot(&self) -> Option<SlotKey> {
        self.active_slot
    }

    pub fn subscribe_active(&self) -> watch::Receiver<Option<SlotKey>> {
        self.active_tx.subscribe()
    }

    pub fn slot(&self, key: SlotKey) -> Option<&PlaybackController> {
        self.slots.get(&key)
    }

    pub fn mounted_slots(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.slots.keys().copied()
    }

    /// Slots currently loading or holding an active player.
    pub fn engaged_slots(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.state().is_engaged())
            .count()
    }

    pub fn slot_view(&self, key: SlotKey) -> Option<SlotView> {
        let slot = self.slots.get(&key)?;
        let snapshot = slot.snapshot();
        let video = slot.video_id();
        let retry_pending = snapshot.state == PlaybackState::Error
            && snapshot.is_active
            && !snapshot.exhausted;

        Some(SlotView {
            key,
            is_active: snapshot.is_active,
            state: snapshot.state,
            has_been_watched: self.watch_cache.has_been_watched(&video),
            is_fully_watched: self.watch_cache.is_fully_watched(&video),
            show_error: snapshot.state == PlaybackState::Error
                && snapshot.exhausted,
            show_spinner: snapshot.state.shows_spinner() || retry_pending,
        })
    }

    pub fn slot_views(&self) -> Vec<SlotView> {
        self.slots
            .keys()
            .filter_map(|key| self.slot_view(*key))
            .collect()
    }

    pub fn post_state(&self) -> ActiveWindowState {
        self.outer.state()
    }

    pub fn carousel_state(&self, post_index: usize) -> Option<ActiveWindowState> {
        self.inner.get(&post_index).map(ActiveWindowResolver::state)
    }

    pub fn post_metrics(&self, index: usize) -> ItemMetrics {
        self.post_layout.metrics(index)
    }

    pub fn carousel_metrics(&self, index: usize) -> ItemMetrics {
        self.carousel_layout.metrics(index)
    }

    fn slot_mut(&mut self, key: SlotKey) -> Result<&mut PlaybackController> {
        self.slots
            .get_mut(&key)
            .ok_or(CoordinatorError::UnknownSlot(key))
    }

    /// Carousel resolver for `post_index`, created on first use.
    fn carousel(
        &mut self,
        post_index: usize,
    ) -> Result<&mut ActiveWindowResolver> {
        let video_count = self
            .posts
            .get(post_index)
            .ok_or(CoordinatorError::UnknownPost(post_index))?
            .video_count();
        let config = &self.config;

        Ok(self.inner.entry(post_index).or_insert_with(|| {
            let mut resolver = ActiveWindowResolver::new(
                "inner",
                config.inner,
                config.debounce(),
                config.arbitration,
            );
            // Adopting the initial carousel index is not a user-driven
            // change and must not trigger a prefetch.
            let _ = resolver.set_item_count(video_count);
            resolver
        }))
    }

    fn desired_slot(&self) -> Option<SlotKey> {
        let post_index = self.outer.active()?;
        let video_index = self.inner.get(&post_index)?.active()?;
        Some(SlotKey::new(post_index, video_index))
    }

    fn on_outer_change(&mut self, change: ActiveIndexChange, now: Instant) {
        if let Some(post_index) = change.current {
            // Posts behind the outer resolver always exist.
            let _ = self.carousel(post_index);
        }
        self.recompute(now);

        if let Some(post_index) = change.current {
            self.evict_outside_window(post_index);
            self.prefetch_after_post(post_index);
        }
    }

    fn on_inner_change(
        &mut self,
        post_index: usize,
        change: ActiveIndexChange,
        now: Instant,
    ) {
        if self.outer.active() != Some(post_index) {
            return;
        }
        self.recompute(now);
        if let Some(video_index) = change.current {
            self.prefetch_after_video(post_index, video_index);
        }
    }

    /// Deactivate every non-selected slot, then activate the selected one.
    fn recompute(&mut self, now: Instant) {
        let desired = self.desired_slot();

        for (key, slot) in self.slots.iter_mut() {
            if Some(*key) != desired {
                slot.set_active(false, now);
            }
        }
        if let Some(key) = desired
            && let Some(slot) = self.slots.get_mut(&key)
        {
            slot.set_active(true, now);
        }

        if desired != self.active_slot {
            debug!(
                previous = ?self.active_slot,
                current = ?desired,
                "active slot changed"
            );
            self.active_slot = desired;
            self.active_tx.send_replace(desired);
        }
    }

    fn evict_outside_window(&mut self, active_post: usize) {
        let window = self.config.render_window_posts;
        let evicted: Vec<SlotKey> = self
            .slots
            .keys()
            .filter(|key| key.post_index.abs_diff(active_post) > window)
            .copied()
            .collect();

        for key in evicted {
            if let Some(mut slot) = self.slots.remove(&key) {
                slot.dispose(UnloadReason::Evicted);
                debug!(slot = %key, active_post, "slot evicted");
            }
        }

        let before = self.inner.len();
        self.inner
            .retain(|post, _| post.abs_diff(active_post) <= window);
        if self.inner.len() < before {
            trace!(
                active_post,
                dropped = before - self.inner.len(),
                "carousel resolvers pruned"
            );
        }
    }

    fn prefetch_after_post(&self, post_index: usize) {
        let lookahead = self.config.prefetch.lookahead;
        for post in (post_index + 1..=post_index + lookahead)
            .filter_map(|i| self.posts.get(i))
        {
            let video = post.first_video();
            self.prefetch.send(PrefetchRequest {
                video_id: video.id,
                locator: video.source.clone(),
            });
        }
    }

    fn prefetch_after_video(&self, post_index: usize, video_index: usize) {
        let Some(post) = self.posts.get(post_index) else {
            return;
        };
        let lookahead = self.config.prefetch.lookahead;
        for video in (video_index + 1..=video_index + lookahead)
            .filter_map(|i| post.video(i))
        {
            self.prefetch.send(PrefetchRequest {
                video_id: video.id,
                locator: video.source.clone(),
            });
        }
    }
}
