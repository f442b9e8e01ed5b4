//! Feed content produced by upstream content supply.
//!
//! Everything here is immutable once constructed. Posts own their carousel
//! in insertion order; that order is the carousel order the host renders.

use url::Url;

use crate::error::{ModelError, Result};
use crate::ids::{AuthorId, PostId, VideoId};

/// Where a video's media can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SourceLocator(Url);

impl SourceLocator {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())?;
        Ok(Self(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// True for locators a network probe can reach (`http`/`https`).
    pub fn is_remote(&self) -> bool {
        matches!(self.0.scheme(), "http" | "https")
    }
}

impl From<Url> for SourceLocator {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// A single playable video inside a post's carousel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoItem {
    pub id: VideoId,
    pub source: SourceLocator,
    pub thumbnail: Option<SourceLocator>,
    /// Duration in seconds when known ahead of playback.
    pub duration: Option<f64>,
    pub title: Option<String>,
}

impl VideoItem {
    pub fn new(id: VideoId, source: SourceLocator) -> Self {
        Self {
            id,
            source,
            thumbnail: None,
            duration: None,
            title: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: SourceLocator) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            self.duration = Some(seconds);
        }
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Reference to the author of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuthorRef {
    pub id: AuthorId,
    pub handle: String,
}

/// Engagement counters displayed alongside a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngagementCounters {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

/// A post in the vertical feed with a non-empty carousel of videos.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "PostItemRepr"))]
pub struct PostItem {
    id: PostId,
    author: AuthorRef,
    text: String,
    videos: Vec<VideoItem>,
    engagement: EngagementCounters,
}

impl PostItem {
    /// Build a post, rejecting an empty carousel.
    pub fn new(
        id: PostId,
        author: AuthorRef,
        text: impl Into<String>,
        videos: Vec<VideoItem>,
        engagement: EngagementCounters,
    ) -> Result<Self> {
        if videos.is_empty() {
            return Err(ModelError::EmptyCarousel);
        }
        Ok(Self {
            id,
            author,
            text: text.into(),
            videos,
            engagement,
        })
    }

    pub fn id(&self) -> PostId {
        self.id
    }

    pub fn author(&self) -> &AuthorRef {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn videos(&self) -> &[VideoItem] {
        &self.videos
    }

    pub fn video(&self, index: usize) -> Option<&VideoItem> {
        self.videos.get(index)
    }

    pub fn first_video(&self) -> &VideoItem {
        // Constructor guarantees at least one entry.
        &self.videos[0]
    }

    pub fn video_count(&self) -> usize {
        self.videos.len()
    }

    pub fn engagement(&self) -> EngagementCounters {
        self.engagement
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct PostItemRepr {
    id: PostId,
    author: AuthorRef,
    text: String,
    videos: Vec<VideoItem>,
    #[serde(default)]
    engagement: EngagementCounters,
}

#[cfg(feature = "serde")]
impl TryFrom<PostItemRepr> for PostItem {
    type Error = ModelError;

    fn try_from(repr: PostItemRepr) -> Result<Self> {
        PostItem::new(
            repr.id,
            repr.author,
            repr.text,
            repr.videos,
            repr.engagement,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> AuthorRef {
        AuthorRef {
            id: AuthorId::new(),
            handle: "someone".into(),
        }
    }

    fn video(n: usize) -> VideoItem {
        let source =
            SourceLocator::parse(&format!("https://cdn.test/v/{n}.mp4"))
                .unwrap();
        VideoItem::new(VideoId::new(), source)
    }

    #[test]
    fn empty_carousel_is_rejected() {
        let err = PostItem::new(
            PostId::new(),
            author(),
            "hello",
            Vec::new(),
            EngagementCounters::default(),
        )
        .unwrap_err();
        assert_eq!(err, ModelError::EmptyCarousel);
    }

    #[test]
    fn carousel_keeps_insertion_order() {
        let videos: Vec<_> = (0..3).map(video).collect();
        let ids: Vec<_> = videos.iter().map(|v| v.id).collect();
        let post = PostItem::new(
            PostId::new(),
            author(),
            "three clips",
            videos,
            EngagementCounters::default(),
        )
        .unwrap();

        assert_eq!(post.video_count(), 3);
        assert_eq!(post.first_video().id, ids[0]);
        let got: Vec<_> = post.videos().iter().map(|v| v.id).collect();
        assert_eq!(got, ids);
        assert!(post.video(3).is_none());
    }

    #[test]
    fn locator_parsing() {
        assert!(SourceLocator::parse("not a url").is_err());
        let remote = SourceLocator::parse(" https://cdn.test/a.mp4 ").unwrap();
        assert!(remote.is_remote());
        let local = SourceLocator::parse("file:///tmp/a.mp4").unwrap();
        assert!(!local.is_remote());
    }

    #[test]
    fn non_finite_duration_is_ignored() {
        let v = video(1).with_duration(f64::NAN);
        assert_eq!(v.duration, None);
        let v = video(1).with_duration(12.5);
        assert_eq!(v.duration, Some(12.5));
    }
}
