//! Active-item resolution for one scroll axis.
//!
//! The feed owns one resolver for the vertical post list and one per post for
//! its horizontal carousel. Each turns host viewability and scroll-offset
//! callbacks into a single debounced active index.

pub mod layout;
pub mod resolver;
pub mod viewability;

pub use layout::{ItemLayout, ItemMetrics};
pub use resolver::{
    ActiveIndexChange, ActiveWindowResolver, ActiveWindowState, ChangeCause,
};
pub use viewability::{ViewableItem, VisibleItem, normalize_viewability};
