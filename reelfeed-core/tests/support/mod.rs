//! Shared fixtures for coordinator integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use reelfeed_config::CoordinatorConfig;
use reelfeed_core::testing::{RecordingAnalytics, RecordingPlayerFactory};
use reelfeed_core::{
    FeedCollaborators, FeedOrchestrator, PlayerEvent, PlayerEventKind,
    PlayerFault, PrefetchHandle, PrefetchRequest, SlotKey, ViewableItem,
    WatchCache,
};
use reelfeed_model::{
    AuthorId, AuthorRef, EngagementCounters, PostId, PostItem, SourceLocator,
    VideoId, VideoItem,
};
use tokio::sync::mpsc::UnboundedReceiver;

pub fn source(post: usize, video: usize) -> SourceLocator {
    SourceLocator::parse(&format!("https://cdn.example.com/p{post}/v{video}.mp4"))
        .expect("valid locator")
}

pub fn posts(count: usize, videos_per_post: usize) -> Vec<PostItem> {
    (0..count)
        .map(|p| {
            let videos = (0..videos_per_post)
                .map(|v| {
                    VideoItem::new(VideoId::new(), source(p, v))
                        .with_duration(15.0)
                })
                .collect();
            PostItem::new(
                PostId::new(),
                AuthorRef {
                    id: AuthorId::new(),
                    handle: format!("creator_{p}"),
                },
                format!("post {p}"),
                videos,
                EngagementCounters::default(),
            )
            .expect("non-empty carousel")
        })
        .collect()
}

pub struct Feed {
    pub orchestrator: FeedOrchestrator,
    pub players: RecordingPlayerFactory,
    pub analytics: RecordingAnalytics,
    pub prefetch_rx: UnboundedReceiver<PrefetchRequest>,
    pub t0: Instant,
}

impl Feed {
    pub fn new(
        config: CoordinatorConfig,
        post_count: usize,
        videos_per_post: usize,
    ) -> Self {
        let players = RecordingPlayerFactory::new();
        let analytics = RecordingAnalytics::new();
        let (prefetch, prefetch_rx) = PrefetchHandle::channel();
        let t0 = Instant::now();

        let mut orchestrator = FeedOrchestrator::new(
            config.clone(),
            FeedCollaborators {
                watch_cache: Arc::new(WatchCache::from_config(
                    &config.watch_cache,
                )),
                analytics: Arc::new(analytics.clone()),
                players: Box::new(players.clone()),
                prefetch,
            },
        )
        .expect("valid config");
        orchestrator.append_posts(posts(post_count, videos_per_post), t0);

        Self {
            orchestrator,
            players,
            analytics,
            prefetch_rx,
            t0,
        }
    }

    pub fn with_defaults(post_count: usize, videos_per_post: usize) -> Self {
        Self::new(CoordinatorConfig::default(), post_count, videos_per_post)
    }

    pub fn at(&self, ms: u64) -> Instant {
        self.t0 + Duration::from_millis(ms)
    }

    pub fn drain_prefetch(&mut self) -> Vec<PrefetchRequest> {
        let mut out = Vec::new();
        while let Ok(request) = self.prefetch_rx.try_recv() {
            out.push(request);
        }
        out
    }

    pub fn show_post(&mut self, post: usize, ms: u64) {
        let now = self.at(ms);
        self.orchestrator
            .report_post_viewability(&[ViewableItem::new(post, 1.0)], now);
    }

    pub fn show_video(&mut self, post: usize, video: usize, ms: u64) {
        let now = self.at(ms);
        self.orchestrator
            .report_carousel_viewability(
                post,
                &[ViewableItem::new(video, 1.0)],
                now,
            )
            .expect("known post");
    }

    pub fn mount(&mut self, key: SlotKey, ms: u64) {
        let now = self.at(ms);
        self.orchestrator.mount_slot(key, now).expect("mountable slot");
    }

    pub fn video_id(&self, key: SlotKey) -> VideoId {
        self.orchestrator.posts()[key.post_index]
            .video(key.video_index)
            .expect("video in carousel")
            .id
    }

    /// Deliver a player event tagged with the slot's latest load.
    pub fn player_event(&mut self, key: SlotKey, kind: PlayerEventKind, ms: u64) {
        let generation = self
            .players
            .last_generation(self.video_id(key))
            .expect("slot has loaded");
        let now = self.at(ms);
        self.orchestrator
            .handle_player_event(key, PlayerEvent::new(generation, kind), now)
            .expect("mounted slot");
    }

    pub fn loaded(&mut self, key: SlotKey, ms: u64) {
        self.player_event(key, PlayerEventKind::Loaded { duration: Some(15.0) }, ms);
    }

    pub fn fail_load(&mut self, key: SlotKey, ms: u64) {
        self.player_event(
            key,
            PlayerEventKind::Failed(PlayerFault::load("source unreachable")),
            ms,
        );
    }

    pub fn tick(&mut self, ms: u64) {
        let now = self.at(ms);
        self.orchestrator.tick(now);
    }
}
