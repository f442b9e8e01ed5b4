use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{layout, viewability};

/// How a raw scroll offset is turned into an index estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollEstimate {
    /// `round(offset / extent)`: the item whose leading edge is nearest.
    #[default]
    Nearest,
    /// `floor((offset + viewport / 2) / extent)`: the item under the
    /// viewport centre.
    Centered,
}

/// Tie-break between the viewability signal and the scroll-offset estimate
/// when they disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationPolicy {
    /// Viewability commits immediately and cancels any pending scroll
    /// commit; scroll estimates only act as a backup once viewability has
    /// been quiet for a full debounce interval.
    #[default]
    PreferViewability,
    /// A pending scroll commit survives viewability reports; viewability
    /// only commits while no scroll candidate is pending.
    PreferScrollEstimate,
    /// Whichever signal arrived last wins; scroll estimates are still
    /// debounced before they commit.
    LatestWins,
}

/// Per-axis resolver and layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisConfig {
    /// Minimum visible fraction for an item to qualify as active.
    pub viewability_threshold: f32,
    /// Fixed per-item size estimate along the axis (px).
    pub item_extent: f32,
    /// Gap between consecutive items (px).
    pub item_spacing: f32,
    /// Size of the viewport along the axis (px).
    pub viewport_extent: f32,
    pub estimate: ScrollEstimate,
    /// Index adopted once the list becomes non-empty, before any report.
    pub initial_index: Option<usize>,
}

impl AxisConfig {
    /// Defaults for the vertical post feed.
    pub const fn outer_defaults() -> Self {
        Self {
            viewability_threshold: viewability::OUTER_THRESHOLD,
            item_extent: layout::POST_EXTENT,
            item_spacing: 0.0,
            viewport_extent: layout::FEED_VIEWPORT,
            estimate: ScrollEstimate::Centered,
            initial_index: None,
        }
    }

    /// Defaults for the horizontal carousel inside each post.
    pub const fn inner_defaults() -> Self {
        Self {
            viewability_threshold: viewability::INNER_THRESHOLD,
            item_extent: layout::VIDEO_EXTENT,
            item_spacing: 0.0,
            viewport_extent: layout::CAROUSEL_VIEWPORT,
            estimate: ScrollEstimate::Nearest,
            initial_index: Some(0),
        }
    }

    /// Distance between the leading edges of consecutive items.
    pub fn stride(&self) -> f32 {
        (self.item_extent + self.item_spacing.max(0.0)).max(1.0)
    }
}

/// Partially specified axis section; unset fields keep the axis defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AxisOverrides {
    viewability_threshold: Option<f32>,
    item_extent: Option<f32>,
    item_spacing: Option<f32>,
    viewport_extent: Option<f32>,
    estimate: Option<ScrollEstimate>,
    initial_index: Option<usize>,
}

impl AxisOverrides {
    fn apply(self, base: AxisConfig) -> AxisConfig {
        AxisConfig {
            viewability_threshold: self
                .viewability_threshold
                .unwrap_or(base.viewability_threshold),
            item_extent: self.item_extent.unwrap_or(base.item_extent),
            item_spacing: self.item_spacing.unwrap_or(base.item_spacing),
            viewport_extent: self
                .viewport_extent
                .unwrap_or(base.viewport_extent),
            estimate: self.estimate.unwrap_or(base.estimate),
            initial_index: self.initial_index.or(base.initial_index),
        }
    }
}

pub(crate) fn outer<'de, D>(deserializer: D) -> Result<AxisConfig, D::Error>
where
    D: Deserializer<'de>,
{
    AxisOverrides::deserialize(deserializer)
        .map(|o| o.apply(AxisConfig::outer_defaults()))
}

pub(crate) fn inner<'de, D>(deserializer: D) -> Result<AxisConfig, D::Error>
where
    D: Deserializer<'de>,
{
    AxisOverrides::deserialize(deserializer)
        .map(|o| o.apply(AxisConfig::inner_defaults()))
}
