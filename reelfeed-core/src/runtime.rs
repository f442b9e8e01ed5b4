//! Async host for the orchestrator.
//!
//! The orchestrator itself is synchronous. [`spawn_feed_runtime`] moves it
//! into a task that applies host commands in arrival order and ticks it on a
//! fixed interval, so every timer fires within one tick of its deadline.

use reelfeed_model::PostItem;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::active_window::ViewableItem;
use crate::orchestrator::{FeedOrchestrator, SlotKey, SlotView};
use crate::playback::PlayerEvent;
use crate::watch_cache::WatchStats;

/// Host callbacks forwarded to the orchestrator task.
#[derive(Debug)]
pub enum FeedCommand {
    AppendPosts(Vec<PostItem>),
    PostViewability(Vec<ViewableItem>),
    PostScroll(f32),
    CarouselViewability {
        post_index: usize,
        items: Vec<ViewableItem>,
    },
    CarouselScroll {
        post_index: usize,
        offset: f32,
    },
    Mount(SlotKey),
    Unmount(SlotKey),
    Player {
        key: SlotKey,
        event: PlayerEvent,
    },
    TogglePause(SlotKey),
    SlotViews(oneshot::Sender<Vec<SlotView>>),
    WatchStats(oneshot::Sender<WatchStats>),
}

/// Handle to a running feed task.
#[derive(Debug, Clone)]
pub struct FeedRuntimeHandle {
    tx: mpsc::UnboundedSender<FeedCommand>,
    active: watch::Receiver<Option<SlotKey>>,
}

impl FeedRuntimeHandle {
    /// Queue a command. Returns false once the task has stopped.
    pub fn send(&self, command: FeedCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    /// Globally active slot, updated on every change.
    pub fn active_slot(&self) -> watch::Receiver<Option<SlotKey>> {
        self.active.clone()
    }

    pub async fn slot_views(&self) -> Option<Vec<SlotView>> {
        let (tx, rx) = oneshot::channel();
        if !self.send(FeedCommand::SlotViews(tx)) {
            return None;
        }
        rx.await.ok()
    }

    pub async fn watch_stats(&self) -> Option<WatchStats> {
        let (tx, rx) = oneshot::channel();
        if !self.send(FeedCommand::WatchStats(tx)) {
            return None;
        }
        rx.await.ok()
    }
}

/// Move `orchestrator` into a task. The task ends, handing the orchestrator
/// back, once every handle has been dropped.
pub fn spawn_feed_runtime(
    orchestrator: FeedOrchestrator,
    tick_every: Duration,
) -> (FeedRuntimeHandle, JoinHandle<FeedOrchestrator>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let active = orchestrator.subscribe_active();
    let handle = FeedRuntimeHandle { tx, active };

    let join = tokio::spawn(async move {
        let mut orchestrator = orchestrator;
        let mut ticker = tokio::time::interval(tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = rx.recv() => {
                    let Some(command) = command else { break };
                    apply(&mut orchestrator, command);
                }
                _ = ticker.tick() => {
                    orchestrator.tick(Instant::now().into_std());
                }
            }
        }
        debug!("feed runtime stopped");
        orchestrator
    });

    (handle, join)
}

fn apply(orchestrator: &mut FeedOrchestrator, command: FeedCommand) {
    let now = Instant::now().into_std();
    let result = match command {
        FeedCommand::AppendPosts(posts) => {
            orchestrator.append_posts(posts, now);
            Ok(())
        }
        FeedCommand::PostViewability(items) => {
            orchestrator.report_post_viewability(&items, now);
            Ok(())
        }
        FeedCommand::PostScroll(offset) => {
            orchestrator.report_post_scroll(offset, now);
            Ok(())
        }
        FeedCommand::CarouselViewability { post_index, items } => {
            orchestrator.report_carousel_viewability(post_index, &items, now)
        }
        FeedCommand::CarouselScroll { post_index, offset } => {
            orchestrator.report_carousel_scroll(post_index, offset, now)
        }
        FeedCommand::Mount(key) => orchestrator.mount_slot(key, now),
        FeedCommand::Unmount(key) => orchestrator.unmount_slot(key),
        FeedCommand::Player { key, event } => {
            orchestrator.handle_player_event(key, event, now)
        }
        FeedCommand::TogglePause(key) => orchestrator.toggle_pause(key),
        FeedCommand::SlotViews(reply) => {
            let _ = reply.send(orchestrator.slot_views());
            Ok(())
        }
        FeedCommand::WatchStats(reply) => {
            let _ = reply.send(orchestrator.watch_cache().stats());
            Ok(())
        }
    };

    if let Err(err) = result {
        warn!(error = %err, "feed command rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::NoopAnalyticsSink;
    use crate::orchestrator::FeedCollaborators;
    use crate::playback::PlaybackState;
    use crate::prefetch::PrefetchHandle;
    use crate::testing::RecordingPlayerFactory;
    use crate::watch_cache::WatchCache;
    use reelfeed_config::CoordinatorConfig;
    use reelfeed_model::{
        AuthorId, AuthorRef, EngagementCounters, PostId, SourceLocator,
        VideoId, VideoItem,
    };
    use std::sync::Arc;

    fn post(n: usize) -> PostItem {
        let video = VideoItem::new(
            VideoId::new(),
            SourceLocator::parse(&format!("https://cdn.example.com/{n}.mp4"))
                .unwrap(),
        );
        PostItem::new(
            PostId::new(),
            AuthorRef {
                id: AuthorId::new(),
                handle: format!("author{n}"),
            },
            "",
            vec![video],
            EngagementCounters::default(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_publishes_active_slot() {
        let (prefetch, _requests) = PrefetchHandle::channel();
        let orchestrator = FeedOrchestrator::new(
            CoordinatorConfig::default(),
            FeedCollaborators {
                watch_cache: Arc::new(WatchCache::new(10, 0.9)),
                analytics: Arc::new(NoopAnalyticsSink),
                players: Box::new(RecordingPlayerFactory::new()),
                prefetch,
            },
        )
        .unwrap();

        let (handle, join) =
            spawn_feed_runtime(orchestrator, Duration::from_millis(16));
        let mut active = handle.active_slot();

        handle.send(FeedCommand::AppendPosts(vec![post(0), post(1)]));
        handle.send(FeedCommand::Mount(SlotKey::new(1, 0)));
        handle.send(FeedCommand::PostViewability(vec![ViewableItem::new(
            1, 1.0,
        )]));

        active.changed().await.unwrap();
        assert_eq!(*active.borrow(), Some(SlotKey::new(1, 0)));

        let views = handle.slot_views().await.unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].is_active);
        assert_eq!(views[0].state, PlaybackState::Loading);

        drop(active);
        drop(handle);
        let orchestrator = join.await.unwrap();
        assert_eq!(orchestrator.active_slot(), Some(SlotKey::new(1, 0)));
    }
}
