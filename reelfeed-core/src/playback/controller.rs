use reelfeed_config::PlaybackConfig;
use reelfeed_model::{VideoId, VideoItem};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::player::{
    FaultClass, PlayerBackend, PlayerEvent, PlayerEventKind, PlayerFault,
};
use super::state::{LoadGeneration, PlaybackState, SlotSnapshot};
use crate::analytics::{AnalyticsEvent, AnalyticsSink, UnloadReason};
use crate::timer::{CancelableTimer, earliest};
use crate::watch_cache::WatchCache;

/// Per-activation guards keeping each analytics event to one emission.
#[derive(Debug, Default, Clone, Copy)]
struct LoggedFlags {
    start: bool,
    complete: bool,
    retry_success: bool,
}

/// Lifecycle controller for one mounted video slot.
///
/// Owns the player for the slot and drives it through load, play, pause,
/// retry and release in response to activation changes, user taps and
/// player callbacks. Player faults never escape: they become state
/// transitions and analytics events.
#[derive(Debug)]
pub struct PlaybackController {
    video: VideoItem,
    config: PlaybackConfig,
    player: Box<dyn PlayerBackend>,
    watch_cache: Arc<WatchCache>,
    analytics: Arc<dyn AnalyticsSink>,

    state: PlaybackState,
    /// State to resume into if re-activated inside the grace window.
    resume_state: PlaybackState,
    is_active: bool,
    attempt: u32,
    exhausted: bool,
    buffering: bool,
    manual_pause: bool,
    resource_loaded: bool,
    generation: LoadGeneration,
    position: f64,
    duration: Option<f64>,

    mounted_at: Instant,
    first_frame_at: Option<Instant>,
    logged: LoggedFlags,

    retry_timer: CancelableTimer,
    pending_retry: Option<FaultClass>,
    autoplay_timer: CancelableTimer,
    grace_timer: CancelableTimer,

    notifier: watch::Sender<PlaybackState>,
}

impl PlaybackController {
    pub fn new(
        video: VideoItem,
        config: PlaybackConfig,
        player: Box<dyn PlayerBackend>,
        watch_cache: Arc<WatchCache>,
        analytics: Arc<dyn AnalyticsSink>,
        mounted_at: Instant,
    ) -> Self {
        let (notifier, _) = watch::channel(PlaybackState::Idle);
        let duration = video.duration;
        Self {
            video,
            config,
            player,
            watch_cache,
            analytics,
            state: PlaybackState::Idle,
            resume_state: PlaybackState::Idle,
            is_active: false,
            attempt: 0,
            exhausted: false,
            buffering: false,
            manual_pause: false,
            resource_loaded: false,
            generation: LoadGeneration::default(),
            position: 0.0,
            duration,
            mounted_at,
            first_frame_at: None,
            logged: LoggedFlags::default(),
            retry_timer: CancelableTimer::new(),
            pending_retry: None,
            autoplay_timer: CancelableTimer::new(),
            grace_timer: CancelableTimer::new(),
            notifier,
        }
    }

    pub fn video(&self) -> &VideoItem {
        &self.video
    }

    pub fn video_id(&self) -> VideoId {
        self.video.id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Retries are used up; only a fresh activation clears this.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn generation(&self) -> LoadGeneration {
        self.generation
    }

    /// Mount-to-first-frame latency, once the first frame has been seen.
    pub fn time_to_first_frame(&self) -> Option<Duration> {
        self.first_frame_at
            .map(|at| at.saturating_duration_since(self.mounted_at))
    }

    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            state: self.state,
            is_active: self.is_active,
            buffering: self.buffering,
            attempt: self.attempt,
            exhausted: self.exhausted,
            manual_pause: self.manual_pause,
            position: self.position,
            duration: self.duration,
            generation: self.generation,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.notifier.subscribe()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([
            self.retry_timer.deadline(),
            self.autoplay_timer.deadline(),
            self.grace_timer.deadline(),
        ])
    }

    pub fn set_active(&mut self, active: bool, now: Instant) {
        if active == self.is_active {
            return;
        }
        if active {
            self.activate(now);
        } else {
            self.deactivate(now);
        }
    }

    fn activate(&mut self, now: Instant) {
        self.is_active = true;
        self.attempt = 0;
        self.exhausted = false;
        self.logged = LoggedFlags::default();

        if self.state == PlaybackState::Unloading {
            self.grace_timer.cancel();
            if self.config.resume_manual_pause_on_reactivation {
                self.manual_pause = false;
            }
            debug!(
                video = %self.video.id,
                resume = %self.resume_state,
                "re-activated inside grace window"
            );
            match self.resume_state {
                PlaybackState::Loading => self.transition(PlaybackState::Loading),
                PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Buffering
                | PlaybackState::PausedByUser
                    if self.resource_loaded =>
                {
                    if self.manual_pause {
                        self.transition(PlaybackState::PausedByUser);
                    } else {
                        self.start_playback(now);
                    }
                }
                _ => self.begin_load(),
            }
            return;
        }

        self.manual_pause = false;
        self.begin_load();
    }

    fn deactivate(&mut self, now: Instant) {
        self.is_active = false;
        self.retry_timer.cancel();
        self.pending_retry = None;
        self.autoplay_timer.cancel();

        match self.state {
            PlaybackState::Idle
            | PlaybackState::Unloaded
            | PlaybackState::Unloading => {}
            previous => {
                if self.resource_loaded {
                    self.player.pause();
                }
                self.buffering = false;
                self.resume_state = previous;
                self.transition(PlaybackState::Unloading);
                self.grace_timer.arm(now, self.config.unload_grace());
            }
        }
        self.tick(now);
    }

    /// Fire whichever timers are due.
    pub fn tick(&mut self, now: Instant) {
        if self.grace_timer.fire(now) && self.state == PlaybackState::Unloading
        {
            self.release(UnloadReason::Deactivated);
        }

        if self.autoplay_timer.fire(now)
            && self.is_active
            && !self.manual_pause
            && self.state == PlaybackState::Ready
        {
            self.play_now();
        }

        if self.retry_timer.fire(now)
            && let Some(class) = self.pending_retry.take()
        {
            // The slot may have moved on while the retry was pending.
            if self.is_active && self.state == PlaybackState::Error {
                self.retry(class);
            }
        }
    }

    /// User tap on the slot.
    pub fn toggle_pause(&mut self) {
        match self.state {
            PlaybackState::Ready
            | PlaybackState::Playing
            | PlaybackState::Buffering => {
                self.manual_pause = true;
                self.autoplay_timer.cancel();
                self.buffering = false;
                self.player.pause();
                self.transition(PlaybackState::PausedByUser);
            }
            PlaybackState::PausedByUser => {
                self.manual_pause = false;
                if self.is_active {
                    self.play_now();
                } else {
                    self.transition(PlaybackState::Ready);
                }
            }
            PlaybackState::Loading => {
                self.manual_pause = !self.manual_pause;
            }
            _ => {}
        }
        debug!(
            video = %self.video.id,
            manual_pause = self.manual_pause,
            state = %self.state,
            "pause toggled"
        );
    }

    /// Release the player immediately on unmount or eviction.
    pub fn dispose(&mut self, reason: UnloadReason) {
        self.is_active = false;
        self.retry_timer.cancel();
        self.pending_retry = None;
        self.autoplay_timer.cancel();
        self.grace_timer.cancel();

        match self.state {
            PlaybackState::Idle | PlaybackState::Unloaded => {}
            _ => self.release(reason),
        }
    }

    pub fn handle_event(&mut self, event: PlayerEvent, now: Instant) {
        if event.generation != self.generation {
            trace!(
                video = %self.video.id,
                event_generation = %event.generation,
                generation = %self.generation,
                "discarding stale player event"
            );
            return;
        }

        match event.kind {
            PlayerEventKind::Loaded { duration } => self.on_loaded(duration, now),
            PlayerEventKind::Buffering => self.on_buffering(),
            PlayerEventKind::Playing { position, duration } => {
                self.on_playing(position, duration, now)
            }
            PlayerEventKind::Progress { position } => self.on_progress(position),
            PlayerEventKind::Finished { duration } => self.on_finished(duration),
            PlayerEventKind::Failed(fault) => self.on_failed(fault, now),
        }
    }

    fn on_loaded(&mut self, duration: Option<f64>, now: Instant) {
        self.resource_loaded = true;
        self.update_duration(duration);
        self.record_first_frame(now);

        if !self.is_active {
            // Completion after deactivation: keep the resource, never play.
            if self.state == PlaybackState::Unloading {
                self.resume_state = PlaybackState::Ready;
            }
            trace!(video = %self.video.id, "load completed while inactive");
            return;
        }
        if self.state != PlaybackState::Loading {
            return;
        }

        if self.manual_pause {
            self.transition(PlaybackState::PausedByUser);
            self.log_retry_success();
        } else {
            self.start_playback(now);
        }
    }

    fn on_buffering(&mut self) {
        if !self.is_active {
            return;
        }
        self.buffering = true;
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Ready) {
            self.transition(PlaybackState::Buffering);
        }
    }

    fn on_playing(&mut self, position: f64, duration: Option<f64>, now: Instant) {
        if !self.is_active || self.manual_pause {
            // A late play from the player must not override the slot's intent.
            if self.resource_loaded {
                self.player.pause();
            }
            if self.is_active && self.state == PlaybackState::Loading {
                // Stream retry resumed while the user had paused.
                self.update_position(position);
                self.update_duration(duration);
                self.transition(PlaybackState::PausedByUser);
                self.log_retry_success();
            }
            return;
        }
        if self.state == PlaybackState::Error {
            return;
        }

        self.resource_loaded = true;
        self.buffering = false;
        self.update_position(position);
        self.update_duration(duration);
        self.record_first_frame(now);
        self.transition(PlaybackState::Playing);

        if !self.logged.start {
            self.logged.start = true;
            self.emit(AnalyticsEvent::PlaybackStart {
                video_id: self.video.id,
                position: self.position,
            });
            self.watch_cache.mark_watched(
                self.video.id,
                self.position,
                self.duration.unwrap_or(0.0),
            );
        }
        self.log_retry_success();
    }

    fn log_retry_success(&mut self) {
        if self.attempt > 0 && !self.logged.retry_success {
            self.logged.retry_success = true;
            self.emit(AnalyticsEvent::RetrySuccess {
                video_id: self.video.id,
                attempt: self.attempt,
            });
        }
    }

    fn on_progress(&mut self, position: f64) {
        self.update_position(position);
        if self.state == PlaybackState::Buffering && self.is_active {
            self.buffering = false;
            self.transition(PlaybackState::Playing);
        }
    }

    fn on_finished(&mut self, duration: f64) {
        if !matches!(
            self.state,
            PlaybackState::Playing | PlaybackState::Buffering
        ) {
            return;
        }
        self.update_duration(Some(duration));
        let duration = self.duration.unwrap_or(duration.max(0.0));
        self.position = duration;
        self.buffering = false;

        if !self.logged.complete {
            self.logged.complete = true;
            self.emit(AnalyticsEvent::PlaybackComplete {
                video_id: self.video.id,
                duration,
            });
            self.watch_cache
                .mark_watched(self.video.id, duration, duration);
        }

        if self.config.loop_playback && self.is_active {
            self.position = 0.0;
            self.player.replay(0.0, self.generation);
        } else {
            self.transition(PlaybackState::Ready);
        }
    }

    fn on_failed(&mut self, fault: PlayerFault, now: Instant) {
        if self.state == PlaybackState::Error {
            return;
        }
        self.buffering = false;
        self.autoplay_timer.cancel();
        if self.state == PlaybackState::Unloading {
            self.resume_state = PlaybackState::Error;
        } else {
            self.transition(PlaybackState::Error);
        }

        self.emit(AnalyticsEvent::PlaybackError {
            video_id: self.video.id,
            error: fault.to_string(),
        });
        if self.attempt > 0 {
            self.emit(AnalyticsEvent::RetryFailed {
                video_id: self.video.id,
                attempt: self.attempt,
            });
        }

        if !self.is_active {
            return;
        }
        if self.attempt < self.config.max_retries {
            self.pending_retry = Some(fault.class);
            self.retry_timer.arm(now, self.config.retry_delay());
            debug!(
                video = %self.video.id,
                attempt = self.attempt,
                class = %fault.class,
                "retry scheduled"
            );
        } else {
            self.exhausted = true;
            warn!(
                video = %self.video.id,
                attempts = self.attempt,
                error = %fault,
                "playback retries exhausted"
            );
        }
    }

    fn begin_load(&mut self) {
        self.generation = self.generation.next();
        self.buffering = false;
        self.resource_loaded = false;
        self.transition(PlaybackState::Loading);
        self.player.load(&self.video.source, self.generation);
    }

    fn retry(&mut self, class: FaultClass) {
        self.attempt += 1;
        self.generation = self.generation.next();
        debug!(
            video = %self.video.id,
            attempt = self.attempt,
            class = %class,
            generation = %self.generation,
            "retrying playback"
        );
        self.transition(PlaybackState::Loading);
        match class {
            FaultClass::Load => {
                self.resource_loaded = false;
                self.player.load(&self.video.source, self.generation);
            }
            FaultClass::Stream => {
                self.player.replay(self.position, self.generation);
            }
        }
    }

    /// Ready to play: play now or after the autoplay delay.
    fn start_playback(&mut self, now: Instant) {
        self.transition(PlaybackState::Ready);
        let delay = self.config.autoplay_delay();
        if delay.is_zero() {
            self.play_now();
        } else {
            self.autoplay_timer.arm(now, delay);
        }
    }

    fn play_now(&mut self) {
        self.buffering = false;
        self.player.play();
        self.transition(PlaybackState::Playing);
    }

    fn release(&mut self, reason: UnloadReason) {
        self.player.unload();
        self.resource_loaded = false;
        self.buffering = false;
        self.generation = self.generation.next();
        self.transition(PlaybackState::Unloaded);
        self.emit(AnalyticsEvent::VideoUnloaded {
            video_id: self.video.id,
            reason,
        });
    }

    fn record_first_frame(&mut self, now: Instant) {
        if self.first_frame_at.is_some() {
            return;
        }
        self.first_frame_at = Some(now);
        let elapsed = now.saturating_duration_since(self.mounted_at);
        self.emit(AnalyticsEvent::TimeToFirstFrame {
            video_id: self.video.id,
            ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }

    fn update_position(&mut self, position: f64) {
        if position.is_finite() && position >= 0.0 {
            self.position = position;
        }
    }

    fn update_duration(&mut self, duration: Option<f64>) {
        if let Some(d) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.duration = Some(d);
        }
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state == next {
            return;
        }
        debug!(
            video = %self.video.id,
            from = %self.state,
            to = %next,
            "playback state"
        );
        self.state = next;
        self.notifier.send_replace(next);
    }

    fn emit(&self, event: AnalyticsEvent) {
        self.analytics.log(&event);
    }
}
