//! Circular histogram binner.
//!
//! Weighted bearings are accumulated into `N` equal sectors around the compass. With the
//! default rotation of half a bin width, bin 0 is centered on north rather than starting
//! at it, so the sector boundaries for `N = 4` sit at 45°, 135°, 225° and 315°.
//!
//! Sectors are half-open: a bearing exactly on a boundary belongs to the sector that the
//! boundary opens. Assignment depends only on the bearing, never on input order.

use serde::{Deserialize, Serialize};

use crate::bearing::compass_label;
use crate::error::{Result, RoseError};
use crate::geo_utils::normalize_degrees;

/// Configuration for histogram generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Bin counts to build for every ski area and group.
    /// Default: [2, 4, 8, 32] (8 for preview roses, 32 for full roses)
    pub bin_counts: Vec<u32>,
    /// Rotation applied before binning, in degrees.
    /// Default: None (half a bin width, centering bin 0 on north)
    pub offset: Option<f64>,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bin_counts: vec![2, 4, 8, 32],
            offset: None,
        }
    }
}

impl HistogramConfig {
    /// Rotation offset used for `num_bins` sectors.
    pub fn offset_for(&self, num_bins: u32) -> f64 {
        self.offset.unwrap_or_else(|| default_offset(num_bins))
    }
}

/// One angular sector of a histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Position of the bin, starting at 1 for the bin containing north
    pub bin_index: u32,
    /// Angular midpoint of the sector in degrees
    pub bin_center: f64,
    /// Accumulated weight
    pub bin_count: f64,
    /// Share of the histogram's total weight (0 when the total is 0)
    pub bin_proportion: f64,
    /// 32-wind compass label when the center falls on a compass point
    pub bin_label: Option<String>,
}

/// A complete histogram over the circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearingHistogram {
    pub num_bins: u32,
    pub bins: Vec<HistogramBin>,
}

impl BearingHistogram {
    /// Sum of all bin counts.
    pub fn total_weight(&self) -> f64 {
        self.bins.iter().map(|b| b.bin_count).sum()
    }

    /// Width of each sector in degrees.
    pub fn bin_width(&self) -> f64 {
        bin_width(self.num_bins)
    }
}

/// Width of each of `num_bins` sectors in degrees.
#[inline]
pub fn bin_width(num_bins: u32) -> f64 {
    360.0 / num_bins as f64
}

/// Half a bin width: the rotation that centers bin 0 on 0°.
#[inline]
pub fn default_offset(num_bins: u32) -> f64 {
    bin_width(num_bins) / 2.0
}

/// Zero-based sector of `bearing` among `num_bins` sectors rotated by `offset`.
///
/// ```rust
/// use ski_rose::histogram::{bin_index, default_offset};
///
/// let offset = default_offset(4); // sectors centered on 0/90/180/270
/// assert_eq!(bin_index(44.0, 4, offset), 0);
/// assert_eq!(bin_index(46.0, 4, offset), 1);
/// assert_eq!(bin_index(45.0, 4, offset), 1); // boundary opens the 90° sector
/// assert_eq!(bin_index(359.0, 4, offset), 0);
/// ```
#[inline]
pub fn bin_index(bearing: f64, num_bins: u32, offset: f64) -> usize {
    let shifted = normalize_degrees(bearing + offset);
    (shifted / bin_width(num_bins)).floor() as usize % num_bins as usize
}

/// Midpoints of the `num_bins` sectors, independent of any data.
pub fn bin_centers(num_bins: u32, offset: f64) -> Vec<f64> {
    let width = bin_width(num_bins);
    (0..num_bins)
        .map(|i| normalize_degrees(i as f64 * width - offset + width / 2.0))
        .collect()
}

/// Accumulate `(bearing, weight)` pairs into `num_bins` sectors.
///
/// Empty input yields all-zero bins.
///
/// ```rust
/// use ski_rose::histogram::{build_histogram, default_offset};
///
/// let pairs = [(10.0, 2.0), (350.0, 1.0), (180.0, 4.0)];
/// let hist = build_histogram(pairs, 4, default_offset(4)).unwrap();
/// assert_eq!(hist.bins[0].bin_count, 3.0);
/// assert_eq!(hist.bins[2].bin_count, 4.0);
/// assert_eq!(hist.bins[0].bin_label.as_deref(), Some("N"));
/// ```
pub fn build_histogram<I>(pairs: I, num_bins: u32, offset: f64) -> Result<BearingHistogram>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    if num_bins == 0 {
        return Err(RoseError::InvalidConfig("num_bins must be positive".to_string()));
    }

    let mut counts = vec![0.0; num_bins as usize];
    for (bearing, weight) in pairs {
        counts[bin_index(bearing, num_bins, offset)] += weight;
    }

    Ok(histogram_from_counts(counts, offset))
}

/// Wrap precomputed per-sector counts as a histogram.
pub(crate) fn histogram_from_counts(counts: Vec<f64>, offset: f64) -> BearingHistogram {
    let num_bins = counts.len() as u32;
    let total: f64 = counts.iter().sum();
    let bins = bin_centers(num_bins, offset)
        .into_iter()
        .zip(counts)
        .enumerate()
        .map(|(i, (center, count))| HistogramBin {
            bin_index: i as u32 + 1,
            bin_center: center,
            bin_count: count,
            bin_proportion: if total > 0.0 { count / total } else { 0.0 },
            bin_label: compass_label(center).map(str::to_string),
        })
        .collect();

    BearingHistogram { num_bins, bins }
}
