use thiserror::Error;

use crate::models::CoordinatorConfig;
use crate::models::axis::AxisConfig;

/// Guard rails a loaded configuration must pass before the coordinator
/// accepts it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{axis} viewability threshold must be within (0, 1], got {value}")]
    Threshold { axis: &'static str, value: f32 },

    #[error("{axis} {field} must be positive, got {value}")]
    Extent {
        axis: &'static str,
        field: &'static str,
        value: f32,
    },

    #[error("prefetch concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("prefetch timeout must be at least 1ms")]
    ZeroTimeout,

    #[error("watch cache capacity must be at least 1")]
    ZeroCapacity,

    #[error("fully watched ratio must be within (0, 1], got {0}")]
    WatchedRatio(f64),
}

impl CoordinatorConfig {
    /// Check every section, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_axis("outer", &self.outer)?;
        validate_axis("inner", &self.inner)?;

        if self.prefetch.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.prefetch.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.watch_cache.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let ratio = self.watch_cache.fully_watched_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::WatchedRatio(ratio));
        }
        Ok(())
    }
}

fn validate_axis(
    axis: &'static str,
    config: &AxisConfig,
) -> Result<(), ConfigError> {
    let t = config.viewability_threshold;
    if !(t > 0.0 && t <= 1.0) {
        return Err(ConfigError::Threshold { axis, value: t });
    }
    for (field, value) in [
        ("item_extent", config.item_extent),
        ("viewport_extent", config.viewport_extent),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::Extent { axis, field, value });
        }
    }
    if !(config.item_spacing.is_finite() && config.item_spacing >= 0.0) {
        return Err(ConfigError::Extent {
            axis,
            field: "item_spacing",
            value: config.item_spacing,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(CoordinatorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = CoordinatorConfig::default();
        config.inner.viewability_threshold = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Threshold {
                axis: "inner",
                value: 1.5
            })
        );

        config.inner.viewability_threshold = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = CoordinatorConfig::default();
        config.prefetch.concurrency = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));

        let mut config = CoordinatorConfig::default();
        config.watch_cache.capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));

        let mut config = CoordinatorConfig::default();
        config.outer.item_extent = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Extent {
                axis: "outer",
                field: "item_extent",
                ..
            })
        ));
    }
}
