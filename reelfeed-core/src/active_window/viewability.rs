//! Viewability records at the host boundary.

use serde::{Deserialize, Serialize};

/// Raw viewability record as reported by a virtualized list host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewableItem {
    pub index: usize,
    pub is_visible: bool,
    /// On-screen fraction in `[0, 1]`. Some hosts only report the boolean.
    #[serde(default)]
    pub visible_fraction: Option<f32>,
}

impl ViewableItem {
    pub fn new(index: usize, visible_fraction: f32) -> Self {
        Self {
            index,
            is_visible: visible_fraction > 0.0,
            visible_fraction: Some(visible_fraction),
        }
    }

    /// Record from a host that only reports visibility.
    pub fn visible(index: usize) -> Self {
        Self {
            index,
            is_visible: true,
            visible_fraction: None,
        }
    }
}

/// Normalised visibility of one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleItem {
    pub index: usize,
    pub fraction: f32,
}

/// Validate and normalise a host report.
///
/// An item the host marks invisible has fraction zero whatever fraction it
/// carries. A missing fraction on a visible item means fully visible. NaN fractions and indices at or past `item_count`
/// are dropped, fractions are clamped into `[0, 1]`, and duplicate indices
/// keep their largest fraction. The result is sorted by index.
pub fn normalize_viewability(
    items: &[ViewableItem],
    item_count: usize,
) -> Vec<VisibleItem> {
    let mut out: Vec<VisibleItem> = items
        .iter()
        .filter(|item| item.index < item_count)
        .filter_map(|item| {
            let fraction = match item.visible_fraction {
                Some(f) if f.is_nan() => return None,
                _ if !item.is_visible => 0.0,
                Some(f) => f.clamp(0.0, 1.0),
                None => 1.0,
            };
            Some(VisibleItem {
                index: item.index,
                fraction,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        a.index
            .cmp(&b.index)
            .then(b.fraction.total_cmp(&a.fraction))
    });
    out.dedup_by_key(|item| item.index);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_missing_fractions_from_visibility() {
        let raw = [
            ViewableItem::visible(0),
            ViewableItem {
                index: 1,
                is_visible: false,
                visible_fraction: None,
            },
        ];
        let items = normalize_viewability(&raw, 5);
        assert_eq!(items[0].fraction, 1.0);
        assert_eq!(items[1].fraction, 0.0);
    }

    #[test]
    fn drops_invalid_and_merges_duplicates() {
        let raw = [
            ViewableItem::new(3, 0.2),
            ViewableItem::new(3, 0.7),
            ViewableItem::new(1, f32::NAN),
            ViewableItem::new(9, 1.0),
            ViewableItem::new(0, 1.4),
            ViewableItem {
                index: 2,
                is_visible: false,
                visible_fraction: Some(0.95),
            },
        ];
        let items = normalize_viewability(&raw, 5);
        assert_eq!(
            items,
            vec![
                VisibleItem {
                    index: 0,
                    fraction: 1.0
                },
                VisibleItem {
                    index: 2,
                    fraction: 0.0
                },
                VisibleItem {
                    index: 3,
                    fraction: 0.7
                },
            ]
        );
    }
}
