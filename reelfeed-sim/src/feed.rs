//! Synthetic feed generation.

use reelfeed_model::{
    AuthorId, AuthorRef, EngagementCounters, ModelResult, PostId, PostItem,
    SourceLocator, VideoId, VideoItem,
};

pub const CDN_BASE: &str = "https://cdn.reelfeed.test";

/// Dimensions of a generated feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedShape {
    pub posts: usize,
    pub videos_per_post: usize,
}

impl Default for FeedShape {
    fn default() -> Self {
        Self {
            posts: 12,
            videos_per_post: 3,
        }
    }
}

pub fn video_source(post: usize, video: usize) -> ModelResult<SourceLocator> {
    SourceLocator::parse(&format!("{CDN_BASE}/posts/{post}/videos/{video}.mp4"))
}

/// Clip length in seconds. Deterministic so replays are reproducible.
pub fn clip_seconds(post: usize, video: usize) -> f64 {
    6.0 + ((post * 7 + video * 3) % 10) as f64
}

/// Build `shape.posts` posts with `shape.videos_per_post` videos each. A
/// zero video count still yields one video per post.
pub fn synthetic_feed(shape: FeedShape) -> ModelResult<Vec<PostItem>> {
    let per_post = shape.videos_per_post.max(1);
    (0..shape.posts)
        .map(|post| {
            let videos = (0..per_post)
                .map(|video| {
                    Ok(VideoItem::new(VideoId::new(), video_source(post, video)?)
                        .with_duration(clip_seconds(post, video))
                        .with_title(format!("clip {post}.{video}")))
                })
                .collect::<ModelResult<Vec<_>>>()?;

            PostItem::new(
                PostId::new(),
                AuthorRef {
                    id: AuthorId::new(),
                    handle: format!("creator_{}", post % 5),
                },
                format!("synthetic post #{post}"),
                videos,
                EngagementCounters {
                    likes: (post as u64 + 1) * 13,
                    comments: post as u64 * 2,
                    shares: post as u64,
                },
            )
        })
        .collect()
}
