use reelfeed_config::AxisConfig;

/// Position of one item along its axis, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemMetrics {
    pub length: f32,
    pub offset: f32,
}

/// Fixed-size item layout answering the host's fast-scroll queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemLayout {
    pub item_extent: f32,
    pub spacing: f32,
}

impl ItemLayout {
    pub fn new(item_extent: f32, spacing: f32) -> Self {
        Self {
            item_extent: item_extent.max(1.0),
            spacing: spacing.max(0.0),
        }
    }

    pub fn from_axis(config: &AxisConfig) -> Self {
        Self::new(config.item_extent, config.item_spacing)
    }

    pub fn stride(&self) -> f32 {
        self.item_extent + self.spacing
    }

    pub fn metrics(&self, index: usize) -> ItemMetrics {
        ItemMetrics {
            length: self.item_extent,
            offset: index as f32 * self.stride(),
        }
    }

    /// Index of the item whose span (including trailing spacing) contains
    /// `offset`. Negative offsets map to 0.
    pub fn index_at(&self, offset: f32) -> usize {
        if !offset.is_finite() || offset <= 0.0 {
            return 0;
        }
        (offset / self.stride()).floor() as usize
    }

    /// Total scrollable length of `count` items.
    pub fn content_length(&self, count: usize) -> f32 {
        match count {
            0 => 0.0,
            n => n as f32 * self.stride() - self.spacing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_follow_stride() {
        let layout = ItemLayout::new(640.0, 10.0);
        assert_eq!(
            layout.metrics(3),
            ItemMetrics {
                length: 640.0,
                offset: 1950.0
            }
        );
        assert_eq!(layout.index_at(1949.0), 2);
        assert_eq!(layout.index_at(1950.0), 3);
        assert_eq!(layout.index_at(-20.0), 0);
        assert_eq!(layout.content_length(2), 1290.0);
    }
}
