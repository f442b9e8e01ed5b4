//! Playback analytics taxonomy.
//!
//! Events are fire-and-forget: a sink receives each one exactly once, has no
//! return channel, and is never retried. Delivery beyond the sink is not the
//! coordinator's concern.

use reelfeed_model::VideoId;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::{self, Debug, Display};
use tracing::info;

/// Why a slot released its player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnloadReason {
    /// The slot stayed inactive past the grace window.
    Deactivated,
    /// The host unmounted the slot.
    Unmounted,
    /// The coordinator dropped the slot from the render window.
    Evicted,
}

impl UnloadReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deactivated => "deactivated",
            Self::Unmounted => "unmounted",
            Self::Evicted => "evicted",
        }
    }
}

impl Display for UnloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    PlaybackStart { video_id: VideoId, position: f64 },
    PlaybackComplete { video_id: VideoId, duration: f64 },
    TimeToFirstFrame { video_id: VideoId, ms: u64 },
    PlaybackError { video_id: VideoId, error: String },
    VideoUnloaded { video_id: VideoId, reason: UnloadReason },
    RetrySuccess { video_id: VideoId, attempt: u32 },
    RetryFailed { video_id: VideoId, attempt: u32 },
}

impl AnalyticsEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaybackStart { .. } => "playback_start",
            Self::PlaybackComplete { .. } => "playback_complete",
            Self::TimeToFirstFrame { .. } => "time_to_first_frame",
            Self::PlaybackError { .. } => "playback_error",
            Self::VideoUnloaded { .. } => "video_unloaded",
            Self::RetrySuccess { .. } => "retry_success",
            Self::RetryFailed { .. } => "retry_failed",
        }
    }

    pub fn video_id(&self) -> VideoId {
        match self {
            Self::PlaybackStart { video_id, .. }
            | Self::PlaybackComplete { video_id, .. }
            | Self::TimeToFirstFrame { video_id, .. }
            | Self::PlaybackError { video_id, .. }
            | Self::VideoUnloaded { video_id, .. }
            | Self::RetrySuccess { video_id, .. }
            | Self::RetryFailed { video_id, .. } => *video_id,
        }
    }

    /// Event payload, always including the video id.
    pub fn payload(&self) -> Value {
        let id = self.video_id().to_string();
        match self {
            Self::PlaybackStart { position, .. } => {
                json!({ "video_id": id, "position": position })
            }
            Self::PlaybackComplete { duration, .. } => {
                json!({ "video_id": id, "duration": duration })
            }
            Self::TimeToFirstFrame { ms, .. } => {
                json!({ "video_id": id, "ms": ms })
            }
            Self::PlaybackError { error, .. } => {
                json!({ "video_id": id, "error": error })
            }
            Self::VideoUnloaded { reason, .. } => {
                json!({ "video_id": id, "reason": reason.as_str() })
            }
            Self::RetrySuccess { attempt, .. }
            | Self::RetryFailed { attempt, .. } => {
                json!({ "video_id": id, "attempt": attempt })
            }
        }
    }
}

/// Side channel receiving analytics events.
pub trait AnalyticsSink: Send + Sync + Debug {
    fn log(&self, event: &AnalyticsEvent);
}

/// Emits every event as an `info` record on the `reelfeed::analytics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalyticsSink;

impl AnalyticsSink for TracingAnalyticsSink {
    fn log(&self, event: &AnalyticsEvent) {
        info!(
            target: "reelfeed::analytics",
            event = event.name(),
            payload = %event.payload(),
        );
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalyticsSink;

impl AnalyticsSink for NoopAnalyticsSink {
    fn log(&self, _event: &AnalyticsEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_event_fields() {
        let id = VideoId::new();
        let event = AnalyticsEvent::VideoUnloaded {
            video_id: id,
            reason: UnloadReason::Evicted,
        };
        assert_eq!(event.name(), "video_unloaded");
        assert_eq!(event.payload()["reason"], "evicted");
        assert_eq!(event.payload()["video_id"], id.to_string());

        let event = AnalyticsEvent::TimeToFirstFrame {
            video_id: id,
            ms: 420,
        };
        assert_eq!(event.payload()["ms"], 420);
    }
}
