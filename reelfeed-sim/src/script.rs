//! Scroll session scripts.
//!
//! A script is a TOML document with an optional `[feed]` table and a list of
//! `[[step]]` tables applied in order. Steps other than `advance_ms` happen
//! at the current virtual instant.
//!
//! ```toml
//! [feed]
//! posts = 8
//! videos_per_post = 3
//! player_latency_ms = 300
//!
//! [[step]]
//! action = "post_viewability"
//! items = [{ index = 0, fraction = 1.0 }]
//!
//! [[step]]
//! action = "advance_ms"
//! ms = 2000
//! ```

use anyhow::{Context, anyhow};
use reelfeed_core::{PlayerFault, ViewableItem};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// Feed overrides. Command-line flags take precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedSection {
    pub posts: Option<usize>,
    pub videos_per_post: Option<usize>,
    pub player_latency_ms: Option<u64>,
}

/// Visibility of one item in a viewability step.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Visible {
    pub index: usize,
    #[serde(default = "full_fraction")]
    pub fraction: f32,
}

fn full_fraction() -> f32 {
    1.0
}

impl From<Visible> for ViewableItem {
    fn from(visible: Visible) -> Self {
        ViewableItem::new(visible.index, visible.fraction)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    #[default]
    Load,
    Stream,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    PostViewability {
        items: Vec<Visible>,
    },
    CarouselViewability {
        post: usize,
        items: Vec<Visible>,
    },
    PostScroll {
        offset: f32,
    },
    CarouselScroll {
        post: usize,
        offset: f32,
    },
    AdvanceMs {
        ms: u64,
    },
    /// Fail the slot's current load or stream.
    PlayerFail {
        post: usize,
        video: usize,
        #[serde(default)]
        kind: FailureKind,
        #[serde(default)]
        message: Option<String>,
    },
    TogglePause {
        post: usize,
        video: usize,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Self::PostViewability { .. } => "post_viewability",
            Self::CarouselViewability { .. } => "carousel_viewability",
            Self::PostScroll { .. } => "post_scroll",
            Self::CarouselScroll { .. } => "carousel_scroll",
            Self::AdvanceMs { .. } => "advance_ms",
            Self::PlayerFail { .. } => "player_fail",
            Self::TogglePause { .. } => "toggle_pause",
        }
    }
}

pub fn fault(kind: FailureKind, message: Option<&str>) -> PlayerFault {
    match kind {
        FailureKind::Load => {
            PlayerFault::load(message.unwrap_or("simulated load failure"))
        }
        FailureKind::Stream => {
            PlayerFault::stream(message.unwrap_or("simulated stream failure"))
        }
    }
}

impl Script {
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents)
            .map_err(|err| anyhow!("invalid session script: {err}"))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read session script {}", path.display())
        })?;
        Self::parse(&contents)
            .with_context(|| format!("while parsing {}", path.display()))
    }

    /// Virtual time covered by the script.
    pub fn total_ms(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                Step::AdvanceMs { ms } => *ms,
                _ => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_action() {
        let script = Script::parse(
            r#"
            [feed]
            posts = 6
            player_latency_ms = 120

            [[step]]
            action = "post_viewability"
            items = [{ index = 0 }, { index = 1, fraction = 0.3 }]

            [[step]]
            action = "carousel_viewability"
            post = 0
            items = [{ index = 2, fraction = 0.9 }]

            [[step]]
            action = "post_scroll"
            offset = 1280.0

            [[step]]
            action = "carousel_scroll"
            post = 2
            offset = 390.0

            [[step]]
            action = "advance_ms"
            ms = 500

            [[step]]
            action = "player_fail"
            post = 2
            video = 1
            kind = "stream"

            [[step]]
            action = "toggle_pause"
            post = 2
            video = 1
            "#,
        )
        .unwrap();

        assert_eq!(script.feed.posts, Some(6));
        assert_eq!(script.feed.videos_per_post, None);
        assert_eq!(script.steps.len(), 7);
        assert_eq!(
            script.steps[0],
            Step::PostViewability {
                items: vec![
                    Visible {
                        index: 0,
                        fraction: 1.0
                    },
                    Visible {
                        index: 1,
                        fraction: 0.3
                    },
                ]
            }
        );
        assert!(matches!(
            script.steps[5],
            Step::PlayerFail {
                kind: FailureKind::Stream,
                message: None,
                ..
            }
        ));
        assert_eq!(script.total_ms(), 500);
    }

    #[test]
    fn rejects_unknown_action() {
        let err = Script::parse(
            r#"
            [[step]]
            action = "teleport"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid session script"));
    }

    #[test]
    fn empty_script_is_valid() {
        let script = Script::parse("").unwrap();
        assert!(script.steps.is_empty());
        assert_eq!(script.feed, FeedSection::default());
    }
}
