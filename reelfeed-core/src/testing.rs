//! Recording fakes for the coordinator's collaborator seams.
//!
//! Used by the crate's own tests and by downstream harnesses that want to
//! drive the coordinator without a real player or network.

use async_trait::async_trait;
use parking_lot::Mutex;
use reelfeed_model::{SourceLocator, VideoId, VideoItem};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::playback::{LoadGeneration, PlayerBackend, PlayerFactory};
use crate::prefetch::{NetworkProbe, ProbeError, ProbeResponse};

/// Analytics sink that keeps every event.
#[derive(Debug, Default, Clone)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<AnalyticsEvent>>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(AnalyticsEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn log(&self, event: &AnalyticsEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Command received by a [`RecordingPlayer`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Load {
        source: SourceLocator,
        generation: LoadGeneration,
    },
    Play,
    Pause,
    Replay {
        from_position: f64,
        generation: LoadGeneration,
    },
    Unload,
}

pub type CommandLog = Arc<Mutex<Vec<(VideoId, PlayerCommand)>>>;

/// Player that records each command it receives.
#[derive(Debug, Clone)]
pub struct RecordingPlayer {
    video: VideoId,
    log: CommandLog,
}

impl RecordingPlayer {
    pub fn new(video: VideoId) -> (Self, CommandLog) {
        let log = CommandLog::default();
        (
            Self {
                video,
                log: log.clone(),
            },
            log,
        )
    }

    fn push(&self, command: PlayerCommand) {
        self.log.lock().push((self.video, command));
    }
}

impl PlayerBackend for RecordingPlayer {
    fn load(&mut self, source: &SourceLocator, generation: LoadGeneration) {
        self.push(PlayerCommand::Load {
            source: source.clone(),
            generation,
        });
    }

    fn play(&mut self) {
        self.push(PlayerCommand::Play);
    }

    fn pause(&mut self) {
        self.push(PlayerCommand::Pause);
    }

    fn replay(&mut self, from_position: f64, generation: LoadGeneration) {
        self.push(PlayerCommand::Replay {
            from_position,
            generation,
        });
    }

    fn unload(&mut self) {
        self.push(PlayerCommand::Unload);
    }
}

/// Factory handing out [`RecordingPlayer`]s that share one command log.
#[derive(Debug, Default, Clone)]
pub struct RecordingPlayerFactory {
    log: CommandLog,
}

impl RecordingPlayerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    pub fn commands_for(&self, video: VideoId) -> Vec<PlayerCommand> {
        self.log
            .lock()
            .iter()
            .filter(|(id, _)| *id == video)
            .map(|(_, command)| command.clone())
            .collect()
    }

    /// Generation of the most recent load or replay issued for `video`.
    pub fn last_generation(&self, video: VideoId) -> Option<LoadGeneration> {
        self.commands_for(video).iter().rev().find_map(|c| match c {
            PlayerCommand::Load { generation, .. }
            | PlayerCommand::Replay { generation, .. } => Some(*generation),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl PlayerFactory for RecordingPlayerFactory {
    fn create(&mut self, video: &VideoItem) -> Box<dyn PlayerBackend> {
        Box::new(RecordingPlayer {
            video: video.id,
            log: self.log.clone(),
        })
    }
}

/// Scripted response of a [`ScriptedProbe`].
#[derive(Debug, Clone)]
pub enum ProbeScript {
    Status(u16),
    Fail(String),
    /// Never answers within any realistic timeout.
    Hang,
}

/// Network probe answering from a script after a fixed latency, tracking
/// peak concurrency.
#[derive(Debug)]
pub struct ScriptedProbe {
    latency: Duration,
    default: ProbeScript,
    overrides: Mutex<HashMap<String, ProbeScript>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedProbe {
    pub fn new(latency: Duration, default: ProbeScript) -> Self {
        Self {
            latency,
            default,
            overrides: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(latency: Duration) -> Self {
        Self::new(latency, ProbeScript::Status(206))
    }

    pub fn script(&self, locator: &SourceLocator, script: ProbeScript) {
        self.overrides
            .lock()
            .insert(locator.as_str().to_string(), script);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// `(locator, range)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkProbe for ScriptedProbe {
    async fn probe(
        &self,
        locator: &SourceLocator,
        range: &str,
    ) -> Result<ProbeResponse, ProbeError> {
        self.calls
            .lock()
            .push((locator.as_str().to_string(), range.to_string()));
        let script = self
            .overrides
            .lock()
            .get(locator.as_str())
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        // Timed-out probes are dropped mid-sleep; release the slot either way.
        let _guard = InFlight(&self.in_flight);

        let latency = match script {
            ProbeScript::Hang => Duration::from_secs(3_600),
            _ => self.latency,
        };
        tokio::time::sleep(latency).await;

        match script {
            ProbeScript::Status(status) => Ok(ProbeResponse { status }),
            ProbeScript::Fail(message) => Err(ProbeError::Transport(message)),
            ProbeScript::Hang => Err(ProbeError::Timeout),
        }
    }
}
