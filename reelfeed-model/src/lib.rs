//! Core data model definitions shared across reelfeed crates.
#![allow(missing_docs)]

pub mod error;
pub mod feed;
pub mod ids;

pub use error::{ModelError, Result as ModelResult};
pub use feed::{
    AuthorRef, EngagementCounters, PostItem, SourceLocator, VideoItem,
};
pub use ids::{AuthorId, PostId, VideoId};
