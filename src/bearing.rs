//! Bearing calculator and hemisphere normalizer.
//!
//! Every segment with horizontal displacement yields exactly one [`WeightedBearing`].
//! Bearings can then be viewed in one of two frames:
//!
//! - [`BearingFrame::Directed`]: the raw compass bearing, used for individual ski area roses.
//! - [`BearingFrame::Poleward`]: southern-hemisphere bearings are reflected across the
//!   east/west axis so that 0° always means "towards the nearest pole". This is the frame
//!   for comparing ski areas across hemispheres.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoseError};
use crate::geo_utils::{initial_bearing, normalize_degrees, DistanceModel};
use crate::segment::Segment;
use crate::Hemisphere;

/// Orientation frame a set of bearings is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BearingFrame {
    #[default]
    Directed,
    Poleward,
}

/// A compass bearing with the physical quantities of the segment it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedBearing {
    /// Degrees in `[0, 360)`, 0 = north, clockwise
    pub bearing: f64,
    /// Aggregation weight, carried unchanged from the segment
    pub weight: f64,
    /// Descent in meters
    pub vertical_drop: f64,
    /// Slope length in meters
    pub distance_3d: f64,
}

impl WeightedBearing {
    /// Express this bearing in `frame` for a source in `hemisphere`.
    #[inline]
    pub fn in_frame(self, frame: BearingFrame, hemisphere: Hemisphere) -> Self {
        match frame {
            BearingFrame::Directed => self,
            BearingFrame::Poleward => Self {
                bearing: normalize_hemisphere(self.bearing, hemisphere),
                ..self
            },
        }
    }
}

/// Compute the bearing of a segment.
///
/// Segments without horizontal displacement fail with [`RoseError::UndefinedBearing`];
/// callers exclude them from aggregation.
pub fn segment_bearing(segment: &Segment, model: DistanceModel) -> Result<WeightedBearing> {
    if segment.distance <= 0.0 {
        return Err(RoseError::UndefinedBearing);
    }
    let bearing =
        initial_bearing(model, &segment.start, &segment.end).ok_or(RoseError::UndefinedBearing)?;
    Ok(WeightedBearing {
        bearing,
        weight: segment.weight,
        vertical_drop: segment.vertical_drop(),
        distance_3d: segment.distance_3d(),
    })
}

/// Bearings for all segments of a run, plus the number of segments skipped as
/// undefined.
pub fn segment_bearings(
    segments: &[Segment],
    model: DistanceModel,
) -> (Vec<WeightedBearing>, usize) {
    let mut undefined = 0;
    let bearings = segments
        .iter()
        .filter_map(|s| match segment_bearing(s, model) {
            Ok(b) => Some(b),
            Err(_) => {
                undefined += 1;
                None
            }
        })
        .collect();
    (bearings, undefined)
}

/// Map a bearing onto the poleward frame.
///
/// Northern bearings pass through. Southern bearings become `(180 - bearing) mod 360`,
/// which keeps east/west and swaps north/south, so due south reads as 0° (poleward).
/// The reflection is its own inverse.
///
/// ```rust
/// use ski_rose::{Hemisphere, bearing::normalize_hemisphere};
///
/// assert_eq!(normalize_hemisphere(180.0, Hemisphere::South), 0.0);
/// assert_eq!(normalize_hemisphere(95.0, Hemisphere::South), 85.0);
/// assert_eq!(normalize_hemisphere(180.0, Hemisphere::North), 180.0);
/// ```
#[inline]
pub fn normalize_hemisphere(bearing: f64, hemisphere: Hemisphere) -> f64 {
    match hemisphere {
        Hemisphere::North => bearing,
        Hemisphere::South => normalize_degrees(180.0 - bearing),
    }
}

/// Labels of the 32-wind compass rose, clockwise from north in 11.25° steps.
pub const COMPASS_LABELS: [&str; 32] = [
    "N", "NbE", "NNE", "NEbN", "NE", "NEbE", "ENE", "EbN",
    "E", "EbS", "ESE", "SEbE", "SE", "SEbS", "SSE", "SbE",
    "S", "SbW", "SSW", "SWbS", "SW", "SWbW", "WSW", "WbS",
    "W", "WbN", "WNW", "NWbW", "NW", "NWbN", "NNW", "NbW",
];

/// Short compass label for an angle that falls on a 32-wind point.
pub fn compass_label(degrees: f64) -> Option<&'static str> {
    let step = 360.0 / COMPASS_LABELS.len() as f64;
    let position = normalize_degrees(degrees) / step;
    let nearest = position.round();
    if (position - nearest).abs() > 1e-9 {
        return None;
    }
    Some(COMPASS_LABELS[nearest as usize % COMPASS_LABELS.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentConfig;
    use crate::RunPoint;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn segment(from: (f64, f64, f64), to: (f64, f64, f64)) -> Segment {
        Segment::between(
            RunPoint::new(from.0, from.1, from.2),
            RunPoint::new(to.0, to.1, to.2),
            &SegmentConfig::default(),
        )
    }

    #[test]
    fn test_due_east_is_90() {
        let s = segment((0.0, 0.0, 100.0), (0.001, 0.0, 90.0));
        let b = segment_bearing(&s, DistanceModel::Haversine).unwrap();
        assert!(approx_eq(b.bearing, 90.0, 1e-9));
        assert_eq!(b.weight, 10.0);
        assert_eq!(b.vertical_drop, 10.0);
    }

    #[test]
    fn test_due_north_is_0() {
        let s = segment((8.0, 46.0, 100.0), (8.0, 46.001, 90.0));
        let b = segment_bearing(&s, DistanceModel::Haversine).unwrap();
        assert!(approx_eq(b.bearing, 0.0, 1e-9));
    }

    #[test]
    fn test_due_south_in_south_is_poleward() {
        let s = segment((-70.0, -33.0, 3000.0), (-70.0, -33.001, 2950.0));
        let b = segment_bearing(&s, DistanceModel::Haversine).unwrap();
        assert!(approx_eq(b.bearing, 180.0, 1e-9));
        let poleward = b.in_frame(BearingFrame::Poleward, Hemisphere::South);
        assert!(approx_eq(poleward.bearing, 0.0, 1e-9));
        assert_eq!(poleward.weight, b.weight);
    }

    #[test]
    fn test_zero_displacement_is_undefined() {
        let s = segment((8.0, 46.0, 100.0), (8.0, 46.0, 50.0));
        assert!(matches!(
            segment_bearing(&s, DistanceModel::Haversine),
            Err(RoseError::UndefinedBearing)
        ));
    }

    #[test]
    fn test_segment_bearings_counts_undefined() {
        let segments = vec![
            segment((8.0, 46.0, 100.0), (8.0, 46.0, 50.0)),
            segment((8.0, 46.0, 50.0), (8.001, 46.0, 40.0)),
        ];
        let (bearings, undefined) = segment_bearings(&segments, DistanceModel::Haversine);
        assert_eq!(bearings.len(), 1);
        assert_eq!(undefined, 1);
    }

    #[test]
    fn test_hemisphere_flip_matches_reference_table() {
        let cases = [
            (0.0, 180.0),
            (5.0, 175.0),
            (45.0, 135.0),
            (90.0, 90.0),
            (95.0, 85.0),
            (180.0, 0.0),
            (265.0, 275.0),
            (270.0, 270.0),
            (360.0, 180.0),
        ];
        for (input, expected) in cases {
            assert!(approx_eq(normalize_hemisphere(input, Hemisphere::South), expected, 1e-12));
            assert_eq!(normalize_hemisphere(input, Hemisphere::North), input);
        }
    }

    #[test]
    fn test_hemisphere_flip_is_involution() {
        for i in 0..720 {
            let b = i as f64 * 0.5;
            let once = normalize_hemisphere(b, Hemisphere::South);
            let twice = normalize_hemisphere(once, Hemisphere::South);
            assert!(approx_eq(twice, b, 1e-9), "{b} -> {twice}");
        }
    }

    #[test]
    fn test_compass_labels() {
        assert_eq!(compass_label(0.0), Some("N"));
        assert_eq!(compass_label(11.25), Some("NbE"));
        assert_eq!(compass_label(90.0), Some("E"));
        assert_eq!(compass_label(348.75), Some("NbW"));
        assert_eq!(compass_label(10.0), None);
    }
}
