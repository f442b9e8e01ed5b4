use serde::{Deserialize, Serialize};
use std::fmt;

use crate::playback::PlaybackState;

/// Position of a video slot in the feed: post index on the outer axis and
/// carousel index within that post.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct SlotKey {
    pub post_index: usize,
    pub video_index: usize,
}

impl SlotKey {
    pub const fn new(post_index: usize, video_index: usize) -> Self {
        Self {
            post_index,
            video_index,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "post {} / video {}", self.post_index, self.video_index)
    }
}

/// What the host renders for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub key: SlotKey,
    pub is_active: bool,
    pub state: PlaybackState,
    pub has_been_watched: bool,
    pub is_fully_watched: bool,
    /// Persistent error affordance after retries are exhausted.
    pub show_error: bool,
    /// Loading indicator while loading, buffering or waiting on a retry.
    pub show_spinner: bool,
}
