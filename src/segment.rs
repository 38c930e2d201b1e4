//! Geometry segmenter: run geometry → directed, weighted segments.
//!
//! Before splitting a run into consecutive point pairs the raw geometry is cleaned:
//! points with implausible elevations are dropped, coordinates are rounded to undo
//! floating point noise from the upstream export, and runs digitized uphill are
//! reversed so every segment points the way a skier travels.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoseError};
use crate::geo_utils::{horizontal_distance, DistanceModel};
use crate::{RunGeometry, RunPoint};

/// How a segment's distance and vertical drop combine into its aggregation weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Vertical drop only. Flat and ascending segments weigh nothing.
    #[default]
    VerticalDrop,
    /// Horizontal distance, regardless of elevation change.
    HorizontalDistance,
    /// Horizontal distance of descending segments; flat and ascending segments weigh nothing.
    DescendingDistance,
}

impl WeightPolicy {
    /// Weight for a segment with the given horizontal distance and (non-negative) drop.
    pub fn weight(&self, distance: f64, vertical_drop: f64) -> f64 {
        match self {
            WeightPolicy::VerticalDrop => vertical_drop,
            WeightPolicy::HorizontalDistance => distance,
            WeightPolicy::DescendingDistance => {
                if vertical_drop > 0.0 {
                    distance
                } else {
                    0.0
                }
            }
        }
    }
}

/// Configuration for segment extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Distance model used for every segment of the run.
    /// Default: haversine
    pub distance_model: DistanceModel,

    /// Weighting of segments for histograms and circular statistics.
    /// Default: vertical drop
    pub weight_policy: WeightPolicy,

    /// Points below this elevation (meters) are treated as bad data and dropped.
    /// Default: -100.0
    pub min_elevation: f64,

    /// Reverse runs whose last point is higher than their first.
    /// Default: true
    pub ensure_downhill: bool,

    /// Round coordinates to 7 decimals and elevations to 2 before segmenting.
    /// Default: true
    pub round_coordinates: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            distance_model: DistanceModel::Haversine,
            weight_policy: WeightPolicy::VerticalDrop,
            min_elevation: -100.0,
            ensure_downhill: true,
            round_coordinates: true,
        }
    }
}

/// A directed edge between two consecutive points of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: RunPoint,
    pub end: RunPoint,
    /// Horizontal distance in meters
    pub distance: f64,
    /// Signed elevation change, end minus start (0 when either elevation is unknown)
    pub elevation_delta: f64,
    /// Aggregation weight under the configured [`WeightPolicy`]
    pub weight: f64,
}

impl Segment {
    /// Build a segment and derive its distance and weight.
    pub fn between(start: RunPoint, end: RunPoint, config: &SegmentConfig) -> Self {
        let distance = horizontal_distance(config.distance_model, &start, &end);
        let elevation_delta = match (start.elevation, end.elevation) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        };
        let weight = config
            .weight_policy
            .weight(distance, (-elevation_delta).max(0.0));
        Self {
            start,
            end,
            distance,
            elevation_delta,
            weight,
        }
    }

    /// Descent along this segment in meters; zero for flat or ascending segments.
    #[inline]
    pub fn vertical_drop(&self) -> f64 {
        (-self.elevation_delta).max(0.0)
    }

    /// Slope length in meters.
    #[inline]
    pub fn distance_3d(&self) -> f64 {
        self.distance.hypot(self.elevation_delta)
    }
}

/// Apply elevation filtering, rounding and downhill orientation to a run's points.
pub fn clean_points(points: &[RunPoint], config: &SegmentConfig) -> Vec<RunPoint> {
    let mut cleaned: Vec<RunPoint> = points
        .iter()
        .filter(|p| p.elevation.map_or(true, |e| e >= config.min_elevation))
        .map(|p| {
            if config.round_coordinates {
                RunPoint {
                    longitude: round_to(p.longitude, 7),
                    latitude: round_to(p.latitude, 7),
                    elevation: p.elevation.map(|e| round_to(e, 2)),
                }
            } else {
                *p
            }
        })
        .collect();

    if config.ensure_downhill {
        let first = cleaned.first().and_then(|p| p.elevation);
        let last = cleaned.last().and_then(|p| p.elevation);
        if let (Some(first), Some(last)) = (first, last) {
            if first < last {
                cleaned.reverse();
            }
        }
    }

    cleaned
}

/// Split a run into its consecutive segments.
///
/// Fails with [`RoseError::InsufficientGeometry`] when fewer than two points survive
/// cleaning.
///
/// ```rust
/// use ski_rose::{RunGeometry, RunPoint, segment::{segment_run, SegmentConfig}};
///
/// let run = RunGeometry::new("run-1", "area-1", vec![
///     RunPoint::new(7.000, 46.000, 2100.0),
///     RunPoint::new(7.000, 45.999, 2060.0),
///     RunPoint::new(7.001, 45.998, 2000.0),
/// ]).unwrap();
///
/// let segments = segment_run(&run, &SegmentConfig::default()).unwrap();
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[0].vertical_drop(), 40.0);
/// ```
pub fn segment_run(run: &RunGeometry, config: &SegmentConfig) -> Result<Vec<Segment>> {
    let points = clean_points(run.points(), config);
    if points.len() < 2 {
        return Err(RoseError::InsufficientGeometry {
            run_id: run.run_id().to_string(),
            points: points.len(),
        });
    }

    Ok(points
        .windows(2)
        .map(|w| Segment::between(w[0], w[1], config))
        .collect())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn descending_run() -> RunGeometry {
        RunGeometry::new(
            "run-1",
            "area-1",
            vec![
                RunPoint::new(10.000, 46.000, 2000.0),
                RunPoint::new(10.000, 45.999, 1950.0),
                RunPoint::new(10.001, 45.999, 1950.0),
                RunPoint::new(10.002, 45.999, 1960.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_one_segment_per_point_pair() {
        let segments = segment_run(&descending_run(), &SegmentConfig::default()).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].elevation_delta, -50.0);
        assert_eq!(segments[1].elevation_delta, 0.0);
        assert_eq!(segments[2].elevation_delta, 10.0);
        assert!(segments.iter().all(|s| s.distance > 0.0));
    }

    #[test]
    fn test_vertical_drop_weight_ignores_flat_and_ascending() {
        let segments = segment_run(&descending_run(), &SegmentConfig::default()).unwrap();
        let weights: Vec<f64> = segments.iter().map(|s| s.weight).collect();
        assert_eq!(weights, vec![50.0, 0.0, 0.0]);
    }

    #[test]
    fn test_horizontal_distance_weight() {
        let config = SegmentConfig {
            weight_policy: WeightPolicy::HorizontalDistance,
            ..SegmentConfig::default()
        };
        let segments = segment_run(&descending_run(), &config).unwrap();
        for s in &segments {
            assert_eq!(s.weight, s.distance);
        }
    }

    #[test]
    fn test_descending_distance_weight() {
        let config = SegmentConfig {
            weight_policy: WeightPolicy::DescendingDistance,
            ..SegmentConfig::default()
        };
        let segments = segment_run(&descending_run(), &config).unwrap();
        assert!(approx_eq(segments[0].weight, segments[0].distance, 1e-12));
        assert_eq!(segments[1].weight, 0.0);
        assert_eq!(segments[2].weight, 0.0);
    }

    #[test]
    fn test_uphill_run_is_reversed() {
        let run = RunGeometry::new(
            "up",
            "area-1",
            vec![
                RunPoint::new(10.0, 46.000, 1000.0),
                RunPoint::new(10.0, 46.001, 1100.0),
            ],
        )
        .unwrap();
        let segments = segment_run(&run, &SegmentConfig::default()).unwrap();
        assert_eq!(segments[0].start.elevation, Some(1100.0));
        assert_eq!(segments[0].vertical_drop(), 100.0);

        let keep = SegmentConfig {
            ensure_downhill: false,
            ..SegmentConfig::default()
        };
        let segments = segment_run(&run, &keep).unwrap();
        assert_eq!(segments[0].vertical_drop(), 0.0);
    }

    #[test]
    fn test_bad_elevations_dropped_then_insufficient() {
        let run = RunGeometry::new(
            "bad",
            "area-1",
            vec![
                RunPoint::new(10.0, 46.000, 1000.0),
                RunPoint::new(10.0, 46.001, -9999.0),
            ],
        )
        .unwrap();
        let err = segment_run(&run, &SegmentConfig::default()).unwrap_err();
        match err {
            RoseError::InsufficientGeometry { run_id, points } => {
                assert_eq!(run_id, "bad");
                assert_eq!(points, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_elevation_carries_no_drop() {
        let run = RunGeometry::new(
            "flat",
            "area-1",
            vec![
                RunPoint::without_elevation(10.0, 46.000),
                RunPoint::without_elevation(10.0, 45.999),
            ],
        )
        .unwrap();
        let segments = segment_run(&run, &SegmentConfig::default()).unwrap();
        assert_eq!(segments[0].elevation_delta, 0.0);
        assert_eq!(segments[0].weight, 0.0);
    }

    #[test]
    fn test_rounding_removes_float_noise() {
        let points = [RunPoint::new(10.000000001, 46.00000004, 1999.999)];
        let cleaned = clean_points(&points, &SegmentConfig::default());
        assert_eq!(cleaned[0].longitude, 10.0);
        assert_eq!(cleaned[0].latitude, 46.0);
        assert_eq!(cleaned[0].elevation, Some(2000.0));
    }

    #[test]
    fn test_distance_3d() {
        let seg = Segment {
            start: RunPoint::new(0.0, 0.0, 100.0),
            end: RunPoint::new(0.0, 0.0, 100.0),
            distance: 30.0,
            elevation_delta: -40.0,
            weight: 40.0,
        };
        assert_eq!(seg.distance_3d(), 50.0);
    }
}
