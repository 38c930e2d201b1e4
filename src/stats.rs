//! Circular statistics and enrichment over a uniform prior.
//!
//! ## Mean bearing and alignment
//!
//! Every bearing becomes a unit vector `(cos θ, sin θ)` in north/east components, scaled
//! by its net magnitude. The mean bearing is the direction of the summed vector. The
//! alignment is the length of that vector divided by the cumulative magnitude: 1 when
//! every segment points the same way, 0 when the directions cancel out. Angles are never
//! averaged as scalars, so 10° and 350° average to north and not to south.
//!
//! Net and cumulative magnitudes are usually both the segment weight. They are kept apart
//! so callers can discount a bearing's pull without shrinking the denominator.
//!
//! ## Enrichment
//!
//! For comparative roses each bin is reported relative to what a uniform spread of the
//! same total weight would put there, after adding a pseudo-weight to both sides, then
//! clipped so outliers cannot dominate a color scale.

use serde::{Deserialize, Serialize};

use crate::bearing::normalize_hemisphere;
use crate::geo_utils::normalize_degrees;
use crate::histogram::{BearingHistogram, HistogramBin};
use crate::Hemisphere;

/// Resultant lengths at or below this fraction of the cumulative magnitude have no
/// meaningful direction.
const DEGENERATE_RESULTANT: f64 = 1e-12;

/// Directional summary of a weighted bearing set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BearingStats {
    /// Circular mean in degrees `[0, 360)`; None without weight or with a degenerate resultant
    pub bearing_mean: Option<f64>,
    /// Mean resultant length in `[0, 1]`; None without weight
    pub bearing_alignment: Option<f64>,
    /// Length of the weighted resultant vector
    pub bearing_magnitude_net: f64,
    /// Sum of cumulative magnitudes (the alignment denominator)
    pub bearing_magnitude_cum: f64,
    /// Alignment projected on the poleward axis, in `[-1, 1]`
    pub poleward_affinity: Option<f64>,
    /// Alignment projected on the east axis, in `[-1, 1]`
    pub eastward_affinity: Option<f64>,
}

impl BearingStats {
    /// True when no weight contributed.
    pub fn is_empty(&self) -> bool {
        self.bearing_alignment.is_none()
    }
}

/// Running weighted vector sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorAccumulator {
    north: f64,
    east: f64,
    cum: f64,
}

impl VectorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bearing whose vector and denominator share one weight.
    #[inline]
    pub fn add(&mut self, bearing: f64, weight: f64) {
        self.add_scaled(bearing, weight, weight);
    }

    /// Add a bearing with separate vector (net) and denominator (cumulative) magnitudes.
    #[inline]
    pub fn add_scaled(&mut self, bearing: f64, net_magnitude: f64, cum_magnitude: f64) {
        let theta = bearing.to_radians();
        self.north += net_magnitude * theta.cos();
        self.east += net_magnitude * theta.sin();
        self.cum += cum_magnitude;
    }

    pub fn resultant_length(&self) -> f64 {
        self.north.hypot(self.east)
    }

    pub fn cumulative_magnitude(&self) -> f64 {
        self.cum
    }

    /// Summarize the accumulated vectors. `hemisphere` orients the poleward axis;
    /// bearings already in the poleward frame should pass [`Hemisphere::North`].
    pub fn finish(&self, hemisphere: Hemisphere) -> BearingStats {
        let magnitude = self.resultant_length();
        if self.cum <= 0.0 || self.cum.is_nan() {
            return BearingStats {
                bearing_magnitude_net: magnitude,
                bearing_magnitude_cum: self.cum,
                ..BearingStats::default()
            };
        }

        let alignment = (magnitude / self.cum).min(1.0);
        if magnitude <= DEGENERATE_RESULTANT * self.cum {
            return BearingStats {
                bearing_mean: None,
                bearing_alignment: Some(0.0),
                bearing_magnitude_net: magnitude,
                bearing_magnitude_cum: self.cum,
                poleward_affinity: Some(0.0),
                eastward_affinity: Some(0.0),
            };
        }

        let mean = normalize_degrees(self.east.atan2(self.north).to_degrees());
        let poleward = normalize_hemisphere(mean, hemisphere).to_radians();
        BearingStats {
            bearing_mean: Some(mean),
            bearing_alignment: Some(alignment),
            bearing_magnitude_net: magnitude,
            bearing_magnitude_cum: self.cum,
            poleward_affinity: Some(alignment * poleward.cos()),
            eastward_affinity: Some(alignment * mean.to_radians().sin()),
        }
    }
}

/// Circular statistics of `(bearing, weight)` pairs.
///
/// ```rust
/// use ski_rose::{Hemisphere, stats::bearing_stats};
///
/// let stats = bearing_stats([(10.0, 1.0), (350.0, 1.0)], Hemisphere::North);
/// let mean = stats.bearing_mean.unwrap();
/// assert!(mean < 1e-9 || mean > 360.0 - 1e-9); // north, not the naive 180°
/// ```
pub fn bearing_stats<I>(pairs: I, hemisphere: Hemisphere) -> BearingStats
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut acc = VectorAccumulator::new();
    for (bearing, weight) in pairs {
        acc.add(bearing, weight);
    }
    acc.finish(hemisphere)
}

// =============================================================================
// Enrichment
// =============================================================================

/// Configuration for enriched (comparative) roses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Bin count of enriched histograms.
    /// Default: 32
    pub num_bins: u32,
    /// Pseudo-weight added to observed and expected weight of every bin.
    /// Default: 10.0 (same unit as segment weights)
    pub prior_weight: f64,
    /// Lower bound on reported enrichment.
    /// Default: 0.25
    pub clip_min: f64,
    /// Upper bound on reported enrichment.
    /// Default: 4.0
    pub clip_max: f64,
    /// Latitude bands with less total weight are left out of comparative views.
    /// Default: 10000.0
    pub min_band_weight: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            num_bins: 32,
            prior_weight: 10.0,
            clip_min: 0.25,
            clip_max: 4.0,
            min_band_weight: 10_000.0,
        }
    }
}

/// A histogram bin with its enrichment over the uniform expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBin {
    #[serde(flatten)]
    pub bin: HistogramBin,
    /// Smoothed, clipped observed / expected ratio
    pub enrichment: f64,
}

/// Smoothed enrichment of a single bin.
#[inline]
pub fn enrichment_ratio(observed: f64, expected: f64, config: &EnrichmentConfig) -> f64 {
    let ratio = (observed + config.prior_weight) / (expected + config.prior_weight);
    ratio.clamp(config.clip_min, config.clip_max)
}

/// Enrich every bin of a histogram against a uniform prior over its total weight.
pub fn enrich_histogram(
    histogram: &BearingHistogram,
    config: &EnrichmentConfig,
) -> Vec<EnrichedBin> {
    let expected = if histogram.num_bins > 0 {
        histogram.total_weight() / histogram.num_bins as f64
    } else {
        0.0
    };
    histogram
        .bins
        .iter()
        .map(|bin| EnrichedBin {
            enrichment: enrichment_ratio(bin.bin_count, expected, config),
            bin: bin.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{build_histogram, default_offset};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    /// Smallest angle between two bearings.
    fn angle_diff(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    fn scaled(bearings: &[f64], net: &[f64], cum: &[f64], hemisphere: Hemisphere) -> BearingStats {
        let mut acc = VectorAccumulator::new();
        for ((b, n), c) in bearings.iter().zip(net).zip(cum) {
            acc.add_scaled(*b, *n, *c);
        }
        acc.finish(hemisphere)
    }

    #[test]
    fn test_single_bearing() {
        let stats = scaled(&[0.0], &[2.0], &[2.0], Hemisphere::North);
        assert!(approx_eq(stats.bearing_mean.unwrap(), 0.0, 1e-9));
        assert!(approx_eq(stats.bearing_alignment.unwrap(), 1.0, 1e-12));
        assert!(approx_eq(stats.poleward_affinity.unwrap(), 1.0, 1e-12));
        assert!(approx_eq(stats.eastward_affinity.unwrap(), 0.0, 1e-12));
    }

    #[test]
    fn test_right_angle_in_south() {
        let stats = scaled(&[0.0, 90.0], &[1.0, 1.0], &[1.0, 1.0], Hemisphere::South);
        assert!(approx_eq(stats.bearing_mean.unwrap(), 45.0, 1e-9));
        assert!(approx_eq(stats.bearing_alignment.unwrap(), 0.7071068, 1e-7));
        assert!(approx_eq(stats.poleward_affinity.unwrap(), -0.5, 1e-9));
        assert!(approx_eq(stats.eastward_affinity.unwrap(), 0.5, 1e-9));
    }

    #[test]
    fn test_right_angle_in_north() {
        let stats = scaled(&[0.0, 90.0], &[0.5, 0.5], &[0.5, 0.5], Hemisphere::North);
        assert!(approx_eq(stats.bearing_alignment.unwrap(), 0.7071068, 1e-7));
        assert!(approx_eq(stats.poleward_affinity.unwrap(), 0.5, 1e-9));
        assert!(approx_eq(stats.eastward_affinity.unwrap(), 0.5, 1e-9));
    }

    #[test]
    fn test_cumulative_magnitude_dilutes_alignment() {
        let stats = scaled(&[0.0, 90.0], &[1.0, 1.0], &[2.0, 2.0], Hemisphere::North);
        assert!(approx_eq(stats.bearing_alignment.unwrap(), 0.3535534, 1e-7));
        assert!(approx_eq(stats.poleward_affinity.unwrap(), 0.25, 1e-9));

        let stats = scaled(&[0.0, 90.0], &[2.0, 4.0], &[10.0, 10.0], Hemisphere::North);
        assert!(approx_eq(stats.bearing_mean.unwrap(), 63.4349488, 1e-7));
        assert!(approx_eq(stats.bearing_alignment.unwrap(), 0.2236068, 1e-7));
        assert!(approx_eq(stats.poleward_affinity.unwrap(), 0.1, 1e-9));
        assert!(approx_eq(stats.eastward_affinity.unwrap(), 0.2, 1e-9));
    }

    #[test]
    fn test_zero_net_weight_is_ignored_by_direction() {
        let stats = scaled(&[0.0, 90.0], &[0.0, 1.0], &[0.5, 1.5], Hemisphere::North);
        assert!(approx_eq(stats.bearing_mean.unwrap(), 90.0, 1e-9));
        assert!(approx_eq(stats.bearing_alignment.unwrap(), 0.5, 1e-12));
    }

    #[test]
    fn test_full_turn_is_same_direction() {
        let stats = bearing_stats([(0.0, 1.0), (360.0, 1.0)], Hemisphere::North);
        assert!(angle_diff(stats.bearing_mean.unwrap(), 0.0) < 1e-9);
        assert!(approx_eq(stats.bearing_alignment.unwrap(), 1.0, 1e-12));
    }

    #[test]
    fn test_wraparound_mean_is_north() {
        let stats = bearing_stats([(10.0, 1.0), (350.0, 1.0)], Hemisphere::North);
        assert!(angle_diff(stats.bearing_mean.unwrap(), 0.0) < 1e-9);
        assert!(approx_eq(stats.bearing_alignment.unwrap(), 10f64.to_radians().cos(), 1e-12));
    }

    #[test]
    fn test_opposed_bearings_are_degenerate() {
        for theta in [0.0, 37.0, 90.0, 123.4, 200.0] {
            let stats = bearing_stats([(theta, 3.0), (theta + 180.0, 3.0)], Hemisphere::North);
            assert_eq!(stats.bearing_mean, None, "theta={theta}");
            assert!(stats.bearing_alignment.unwrap() < 1e-9);
            assert_eq!(stats.poleward_affinity, Some(0.0));
            assert_eq!(stats.eastward_affinity, Some(0.0));
        }
    }

    #[test]
    fn test_zero_weight_is_undefined_not_zero() {
        let stats = bearing_stats([(90.0, 0.0)], Hemisphere::North);
        assert!(stats.is_empty());
        assert_eq!(stats.bearing_mean, None);
        assert_eq!(stats.bearing_alignment, None);
        assert_eq!(stats.poleward_affinity, None);

        let empty = bearing_stats(std::iter::empty(), Hemisphere::South);
        assert!(empty.is_empty());
        assert_eq!(empty.bearing_magnitude_cum, 0.0);
    }

    #[test]
    fn test_uniform_input_has_unit_enrichment() {
        let n = 32;
        let pairs: Vec<(f64, f64)> = (0..n).map(|i| (i as f64 * 360.0 / n as f64, 250.0)).collect();
        let hist = build_histogram(pairs, n, default_offset(n)).unwrap();
        let enriched = enrich_histogram(&hist, &EnrichmentConfig::default());
        assert_eq!(enriched.len(), 32);
        for bin in &enriched {
            assert!(approx_eq(bin.enrichment, 1.0, 1e-12));
        }
    }

    #[test]
    fn test_enrichment_is_smoothed_and_clipped() {
        let config = EnrichmentConfig {
            prior_weight: 1.0,
            clip_min: 0.5,
            clip_max: 2.0,
            ..EnrichmentConfig::default()
        };
        // everything in one of four bins: expected 25 per bin
        let hist = build_histogram([(0.0, 100.0)], 4, default_offset(4)).unwrap();
        let enriched = enrich_histogram(&hist, &config);
        assert_eq!(enriched[0].enrichment, 2.0); // 101/26 clipped
        assert_eq!(enriched[1].enrichment, 0.5); // 1/26 clipped

        assert!(approx_eq(enrichment_ratio(30.0, 25.0, &config), 31.0 / 26.0, 1e-12));
    }

    #[test]
    fn test_empty_histogram_enrichment_is_neutral() {
        let hist = build_histogram(std::iter::empty(), 8, default_offset(8)).unwrap();
        let enriched = enrich_histogram(&hist, &EnrichmentConfig::default());
        assert!(enriched.iter().all(|b| b.enrichment == 1.0));
    }
}
