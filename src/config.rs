//! Top-level analysis configuration.
//!
//! [`RoseConfig`] composes the per-stage configs. Every field has a default, so a JSON
//! file only needs to name the parameters it changes:
//!
//! ```rust
//! use ski_rose::{RoseConfig, WeightPolicy};
//!
//! let config = RoseConfig::from_json_str(r#"{
//!     "segment": { "weight_policy": "descending_distance" },
//!     "enrichment": { "clip_max": 3.0 }
//! }"#).unwrap();
//!
//! assert_eq!(config.segment.weight_policy, WeightPolicy::DescendingDistance);
//! assert_eq!(config.enrichment.clip_max, 3.0);
//! assert_eq!(config.histogram.bin_counts, vec![2, 4, 8, 32]);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::GroupingConfig;
use crate::error::{Result, RoseError};
use crate::histogram::HistogramConfig;
use crate::segment::SegmentConfig;
use crate::stats::EnrichmentConfig;

/// Configuration for a complete analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoseConfig {
    pub segment: SegmentConfig,
    pub histogram: HistogramConfig,
    pub enrichment: EnrichmentConfig,
    pub grouping: GroupingConfig,
}

impl RoseConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RoseConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file and validate it.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check every parameter before any data is touched.
    pub fn validate(&self) -> Result<()> {
        let seg = &self.segment;
        if !seg.min_elevation.is_finite() {
            return Err(invalid("segment.min_elevation must be finite"));
        }

        let hist = &self.histogram;
        if hist.bin_counts.is_empty() {
            return Err(invalid("histogram.bin_counts must name at least one bin count"));
        }
        if hist.bin_counts.iter().any(|&n| n == 0) {
            return Err(invalid("histogram.bin_counts must be positive"));
        }
        if let Some(offset) = hist.offset {
            if !offset.is_finite() {
                return Err(invalid("histogram.offset must be finite"));
            }
        }

        let enr = &self.enrichment;
        if enr.num_bins == 0 {
            return Err(invalid("enrichment.num_bins must be positive"));
        }
        if !(enr.prior_weight.is_finite() && enr.prior_weight > 0.0) {
            return Err(invalid("enrichment.prior_weight must be a positive number"));
        }
        if !(enr.clip_min.is_finite() && enr.clip_max.is_finite()) {
            return Err(invalid("enrichment clip bounds must be finite"));
        }
        if enr.clip_min < 0.0 || enr.clip_min > enr.clip_max {
            return Err(invalid("enrichment requires 0 <= clip_min <= clip_max"));
        }
        if !(enr.min_band_weight.is_finite() && enr.min_band_weight >= 0.0) {
            return Err(invalid("enrichment.min_band_weight must be non-negative"));
        }

        let step = self.grouping.latitude_band_step;
        if step == 0 || step > 90 {
            return Err(invalid("grouping.latitude_band_step must be within 1..=90 degrees"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> RoseError {
    RoseError::InvalidConfig(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::DistanceModel;
    use crate::segment::WeightPolicy;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RoseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RoseConfig::from_json_str(r#"{"grouping": {"latitude_band_step": 5}}"#)
            .unwrap();
        assert_eq!(config.grouping.latitude_band_step, 5);
        assert_eq!(config.segment.distance_model, DistanceModel::Haversine);
        assert_eq!(config.segment.weight_policy, WeightPolicy::VerticalDrop);
        assert_eq!(config.enrichment.num_bins, 32);
    }

    #[test]
    fn test_rejects_zero_bins() {
        let mut config = RoseConfig::default();
        config.histogram.bin_counts = vec![8, 0];
        assert!(matches!(config.validate(), Err(RoseError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_clip() {
        let mut config = RoseConfig::default();
        config.enrichment.clip_min = 5.0;
        config.enrichment.clip_max = 2.0;
        assert!(matches!(config.validate(), Err(RoseError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_latitude_step() {
        let mut config = RoseConfig::default();
        config.grouping.latitude_band_step = 0;
        assert!(config.validate().is_err());
        config.grouping.latitude_band_step = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let err = RoseConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, RoseError::Json(_)));
    }
}
