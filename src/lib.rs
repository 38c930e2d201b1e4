//! # Ski Rose
//!
//! Directional statistics for downhill ski runs, and the "ski rose" histograms built from them.
//!
//! This library provides:
//! - Segmenting of run geometry into directed, descent-weighted segments
//! - Compass bearings with hemisphere-aware (poleward) normalization
//! - Circular histograms, circular means and alignment scores
//! - Per-ski-area, hemisphere, latitude band and worldwide roll-ups
//! - Enrichment of comparative roses over a uniform angular prior
//!
//! ## Features
//!
//! - **`parallel`** (default) - Process ski areas in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use ski_rose::{analyze_runs, AreaLabels, GroupKey, RoseConfig, RunGeometry, RunPoint};
//!
//! // A run heading north-east, losing 120m
//! let run = RunGeometry::new("run-1", "area-1", vec![
//!     RunPoint::new(7.000, 46.000, 2200.0),
//!     RunPoint::new(7.001, 46.001, 2140.0),
//!     RunPoint::new(7.002, 46.002, 2080.0),
//! ]).unwrap();
//!
//! let analysis = analyze_runs(&[run], &AreaLabels::new(), &RoseConfig::default()).unwrap();
//! let area = analysis.ski_area("area-1").unwrap();
//!
//! assert_eq!(area.combined_vertical, 120.0);
//! let mean = area.stats.bearing_mean.unwrap();
//! assert!(mean > 30.0 && mean < 40.0);
//! assert!(analysis.group(&GroupKey::AllAreas).is_some());
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Result, RoseError};

pub mod geo_utils;
pub use geo_utils::DistanceModel;

pub mod segment;
pub use segment::{Segment, SegmentConfig, WeightPolicy};

pub mod bearing;
pub use bearing::{BearingFrame, WeightedBearing};

pub mod histogram;
pub use histogram::{BearingHistogram, HistogramBin, HistogramConfig};

pub mod stats;
pub use stats::{BearingStats, EnrichedBin, EnrichmentConfig};

pub mod aggregate;
pub use aggregate::{
    analyze_runs, AreaBearingSummary, AreaLabels, EnrichedHistogramRecord, GroupKey,
    GroupKind, GroupingConfig, RoseAnalysis, SkipReport, SkippedRun, SummaryFilter,
};
#[cfg(feature = "parallel")]
pub use aggregate::analyze_runs_parallel;

pub mod config;
pub use config::RoseConfig;

pub mod io;

// ============================================================================
// Core Types
// ============================================================================

/// A point of a run: WGS84 longitude/latitude in degrees, elevation in meters.
///
/// # Example
/// ```
/// use ski_rose::RunPoint;
/// let summit = RunPoint::new(6.8652, 45.8326, 4808.0); // Mont Blanc
/// assert!(summit.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: Option<f64>,
}

impl RunPoint {
    /// Create a point with a known elevation.
    pub fn new(longitude: f64, latitude: f64, elevation: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation: Some(elevation),
        }
    }

    /// Create a point whose elevation is unknown.
    pub fn without_elevation(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation: None,
        }
    }

    /// Check that the coordinates are finite WGS84 degrees.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
            && self.elevation.map_or(true, f64::is_finite)
    }
}

/// The ordered geometry of one downhill run within one ski area.
///
/// Holds at least two points. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RunGeometry {
    run_id: String,
    ski_area_id: String,
    points: Vec<RunPoint>,
}

impl RunGeometry {
    /// Create a run from points already in traversal order.
    ///
    /// Returns [`RoseError::InsufficientGeometry`] for fewer than 2 points.
    pub fn new(
        run_id: impl Into<String>,
        ski_area_id: impl Into<String>,
        points: Vec<RunPoint>,
    ) -> Result<Self> {
        let run_id = run_id.into();
        if points.len() < 2 {
            return Err(RoseError::InsufficientGeometry {
                run_id,
                points: points.len(),
            });
        }
        Ok(Self {
            run_id,
            ski_area_id: ski_area_id.into(),
            points,
        })
    }

    /// Create a run from `(index, point)` pairs in any order.
    ///
    /// Points are sorted by index. A repeated index is rejected with
    /// [`RoseError::DuplicatePointIndex`].
    pub fn from_indexed(
        run_id: impl Into<String>,
        ski_area_id: impl Into<String>,
        mut indexed: Vec<(u32, RunPoint)>,
    ) -> Result<Self> {
        let run_id = run_id.into();
        indexed.sort_by_key(|(index, _)| *index);
        if let Some(w) = indexed.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(RoseError::DuplicatePointIndex {
                run_id,
                index: w[0].0,
            });
        }
        let points = indexed.into_iter().map(|(_, p)| p).collect();
        Self::new(run_id, ski_area_id, points)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn ski_area_id(&self) -> &str {
        &self.ski_area_id
    }

    pub fn points(&self) -> &[RunPoint] {
        &self.points
    }
}

/// Hemisphere of a ski area, decided by the sign of its latitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    /// Positive latitudes are northern; the equator and below count as southern.
    pub fn from_latitude(latitude: f64) -> Self {
        if latitude > 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Hemisphere::North => "north",
            Hemisphere::South => "south",
        }
    }
}

impl std::fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
