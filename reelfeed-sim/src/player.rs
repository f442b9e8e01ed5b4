//! Simulated media player.
//!
//! Players never call back directly. Every completion is pushed onto a
//! shared [`EventQueue`] with a virtual due time, and the driver delivers it
//! to the orchestrator once the simulated clock reaches it.

use parking_lot::Mutex;
use reelfeed_core::{
    Clock, LoadGeneration, PlayerBackend, PlayerEvent, PlayerEventKind,
    PlayerFactory,
};
use reelfeed_model::{SourceLocator, VideoId, VideoItem};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Player completion waiting for the simulated clock.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub due: Instant,
    pub video: VideoId,
    pub event: PlayerEvent,
    seq: u64,
}

#[derive(Debug, Default)]
struct QueueInner {
    events: Vec<ScheduledEvent>,
    next_seq: u64,
}

/// Pending player completions shared by every simulated player.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, due: Instant, video: VideoId, event: PlayerEvent) {
        let mut inner = self.inner.lock();
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.events.push(ScheduledEvent {
            due,
            video,
            event,
            seq,
        });
    }

    /// Drop everything still pending for `video`.
    pub fn cancel(&self, video: VideoId) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.events.len();
        inner.events.retain(|event| event.video != video);
        before - inner.events.len()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.inner.lock().events.iter().map(|event| event.due).min()
    }

    /// Remove and return the earliest event due at or before `now`. Events
    /// sharing a due time come out in the order they were scheduled.
    pub fn pop_due(&self, now: Instant) -> Option<ScheduledEvent> {
        let mut inner = self.inner.lock();
        let position = inner
            .events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.due <= now)
            .min_by_key(|(_, event)| (event.due, event.seq))
            .map(|(position, _)| position)?;
        Some(inner.events.swap_remove(position))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Player that loads after a fixed latency and plays clips to the end in
/// virtual time.
#[derive(Debug)]
pub struct SimPlayer {
    video: VideoId,
    duration: Option<f64>,
    latency: Duration,
    clock: Arc<dyn Clock>,
    queue: EventQueue,
    generation: LoadGeneration,
    position: f64,
    playing_since: Option<Instant>,
}

impl SimPlayer {
    pub fn new(
        video: &VideoItem,
        latency: Duration,
        clock: Arc<dyn Clock>,
        queue: EventQueue,
    ) -> Self {
        Self {
            video: video.id,
            duration: video.duration.filter(|d| d.is_finite() && *d > 0.0),
            latency,
            clock,
            queue,
            generation: LoadGeneration::default(),
            position: 0.0,
            playing_since: None,
        }
    }

    fn schedule(&self, due: Instant, kind: PlayerEventKind) {
        self.queue
            .push(due, self.video, PlayerEvent::new(self.generation, kind));
    }

    fn stop_clock(&mut self, now: Instant) {
        if let Some(since) = self.playing_since.take() {
            self.position += now.saturating_duration_since(since).as_secs_f64();
            if let Some(duration) = self.duration {
                self.position = self.position.min(duration);
            }
        }
    }
}

impl PlayerBackend for SimPlayer {
    fn load(&mut self, source: &SourceLocator, generation: LoadGeneration) {
        self.queue.cancel(self.video);
        self.generation = generation;
        self.position = 0.0;
        self.playing_since = None;

        let now = self.clock.now();
        trace!(video = %self.video, %source, %generation, "sim load");
        self.schedule(
            now + self.latency,
            PlayerEventKind::Loaded {
                duration: self.duration,
            },
        );
    }

    fn play(&mut self) {
        if self.playing_since.is_some() {
            return;
        }
        let now = self.clock.now();
        self.playing_since = Some(now);
        self.schedule(
            now,
            PlayerEventKind::Playing {
                position: self.position,
                duration: self.duration,
            },
        );
        if let Some(duration) = self.duration {
            let remaining = (duration - self.position).max(0.0);
            self.schedule(
                now + Duration::from_secs_f64(remaining),
                PlayerEventKind::Finished { duration },
            );
        }
    }

    fn pause(&mut self) {
        let now = self.clock.now();
        self.stop_clock(now);
        self.queue.cancel(self.video);
    }

    fn replay(&mut self, from_position: f64, generation: LoadGeneration) {
        self.queue.cancel(self.video);
        self.generation = generation;
        self.position = from_position.max(0.0);
        self.playing_since = None;
        self.play();
    }

    fn unload(&mut self) {
        self.queue.cancel(self.video);
        self.playing_since = None;
        self.position = 0.0;
    }
}

/// Creates a [`SimPlayer`] for every mounted slot.
#[derive(Debug, Clone)]
pub struct SimPlayerFactory {
    latency: Duration,
    clock: Arc<dyn Clock>,
    queue: EventQueue,
}

impl SimPlayerFactory {
    pub fn new(
        latency: Duration,
        clock: Arc<dyn Clock>,
        queue: EventQueue,
    ) -> Self {
        Self {
            latency,
            clock,
            queue,
        }
    }
}

impl PlayerFactory for SimPlayerFactory {
    fn create(&mut self, video: &VideoItem) -> Box<dyn PlayerBackend> {
        Box::new(SimPlayer::new(
            video,
            self.latency,
            self.clock.clone(),
            self.queue.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelfeed_core::ManualClock;

    fn player(latency_ms: u64) -> (SimPlayer, EventQueue, ManualClock) {
        let clock = ManualClock::new();
        let queue = EventQueue::new();
        let video = VideoItem::new(
            VideoId::new(),
            SourceLocator::parse("https://cdn.reelfeed.test/a.mp4").unwrap(),
        )
        .with_duration(10.0);
        let player = SimPlayer::new(
            &video,
            Duration::from_millis(latency_ms),
            Arc::new(clock.clone()),
            queue.clone(),
        );
        (player, queue, clock)
    }

    #[test]
    fn load_completes_after_latency() {
        let (mut player, queue, clock) = player(250);
        let source = SourceLocator::parse("https://cdn.reelfeed.test/a.mp4").unwrap();
        let generation = LoadGeneration::default().next();
        player.load(&source, generation);

        let start = clock.now();
        assert!(queue.pop_due(start).is_none());
        assert_eq!(queue.next_due(), Some(start + Duration::from_millis(250)));

        let event = queue.pop_due(start + Duration::from_millis(250)).unwrap();
        assert_eq!(event.event.generation, generation);
        assert!(matches!(
            event.event.kind,
            PlayerEventKind::Loaded { duration: Some(d) } if d == 10.0
        ));
    }

    #[test]
    fn pause_keeps_position_and_drops_finish() {
        let (mut player, queue, clock) = player(0);
        player.play();
        let playing = queue.pop_due(clock.now()).unwrap();
        assert!(matches!(playing.event.kind, PlayerEventKind::Playing { .. }));

        clock.advance(Duration::from_secs(4));
        player.pause();
        assert!(queue.is_empty());

        player.play();
        let resumed = queue.pop_due(clock.now()).unwrap();
        assert!(matches!(
            resumed.event.kind,
            PlayerEventKind::Playing { position, .. } if (position - 4.0).abs() < 1e-9
        ));
        assert_eq!(
            queue.next_due(),
            Some(clock.now() + Duration::from_secs(6))
        );
    }

    #[test]
    fn unload_cancels_pending_events() {
        let (mut player, queue, _clock) = player(100);
        let source = SourceLocator::parse("https://cdn.reelfeed.test/a.mp4").unwrap();
        player.load(&source, LoadGeneration::default().next());
        player.unload();
        assert!(queue.is_empty());
    }
}
