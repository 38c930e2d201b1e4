//! # Geographic Utilities
//!
//! Distance and direction primitives shared by every pipeline stage.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two run points |
//! | [`equirectangular_distance`] | Small-scale planar approximation of the same distance |
//! | [`horizontal_distance`] | Distance under a chosen [`DistanceModel`] |
//! | [`initial_bearing`] | Compass bearing from one point towards another |
//! | [`normalize_degrees`] | Wrap any angle into `[0, 360)` |
//! | [`compute_center`] | Centroid of a set of run points |
//!
//! ## Example
//!
//! ```rust
//! use ski_rose::{RunPoint, geo_utils::{self, DistanceModel}};
//!
//! let top = RunPoint::new(6.8650, 45.9237, 2700.0);
//! let bottom = RunPoint::new(6.8700, 45.9200, 2450.0);
//!
//! let meters = geo_utils::horizontal_distance(DistanceModel::Haversine, &top, &bottom);
//! let bearing = geo_utils::initial_bearing(DistanceModel::Haversine, &top, &bottom).unwrap();
//! println!("{:.0}m heading {:.1}°", meters, bearing);
//! assert!(bearing > 90.0 && bearing < 180.0); // south-east
//! ```
//!
//! ## Distance models
//!
//! Distances feed segment weights, so one model must be used for a whole analysis run.
//! [`DistanceModel::Haversine`] goes through `geo`'s great-circle implementation and
//! uses the great-circle initial bearing. [`DistanceModel::Equirectangular`] projects
//! each segment onto a local east/north plane, which is indistinguishable at ski-run
//! scale and cheaper to evaluate.
//!
//! All functions expect WGS84 longitude/latitude in degrees.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::RunPoint;

/// Mean earth radius in meters, matching the radius `geo` uses for haversine.
pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// How horizontal distance and bearing are measured between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceModel {
    /// Great-circle distance and initial bearing on a spherical earth.
    #[default]
    Haversine,
    /// Local planar approximation scaled by the cosine of the mean latitude.
    Equirectangular,
}

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in meters between two run points.
///
/// Elevation is ignored; see [`Segment::distance_3d`](crate::segment::Segment::distance_3d)
/// for slope length.
#[inline]
pub fn haversine_distance(p1: &RunPoint, p2: &RunPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Planar distance in meters on a local equirectangular projection.
#[inline]
pub fn equirectangular_distance(p1: &RunPoint, p2: &RunPoint) -> f64 {
    let (east, north) = local_offsets(p1, p2);
    east.hypot(north) * MEAN_EARTH_RADIUS
}

/// Horizontal distance in meters under the given model.
#[inline]
pub fn horizontal_distance(model: DistanceModel, p1: &RunPoint, p2: &RunPoint) -> f64 {
    match model {
        DistanceModel::Haversine => haversine_distance(p1, p2),
        DistanceModel::Equirectangular => equirectangular_distance(p1, p2),
    }
}

// =============================================================================
// Direction Functions
// =============================================================================

/// Compass bearing in degrees (0 = north, clockwise) from `from` towards `to`.
///
/// Returns `None` when the points share a horizontal position, since a segment with no
/// horizontal displacement has no direction.
///
/// ```rust
/// use ski_rose::{RunPoint, geo_utils::{initial_bearing, DistanceModel}};
///
/// let origin = RunPoint::without_elevation(0.0, 0.0);
/// let east = RunPoint::without_elevation(0.01, 0.0);
/// let north = RunPoint::without_elevation(0.0, 0.01);
///
/// let to_east = initial_bearing(DistanceModel::Haversine, &origin, &east).unwrap();
/// assert!((to_east - 90.0).abs() < 1e-9);
/// assert!(initial_bearing(DistanceModel::Haversine, &origin, &north).unwrap().abs() < 1e-9);
/// assert!(initial_bearing(DistanceModel::Haversine, &origin, &origin).is_none());
/// ```
pub fn initial_bearing(model: DistanceModel, from: &RunPoint, to: &RunPoint) -> Option<f64> {
    if from.longitude == to.longitude && from.latitude == to.latitude {
        return None;
    }

    let (east, north) = match model {
        DistanceModel::Haversine => {
            let phi1 = from.latitude.to_radians();
            let phi2 = to.latitude.to_radians();
            let delta_lambda = (to.longitude - from.longitude).to_radians();
            (
                delta_lambda.sin() * phi2.cos(),
                phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos(),
            )
        }
        DistanceModel::Equirectangular => local_offsets(from, to),
    };

    if east == 0.0 && north == 0.0 {
        return None;
    }

    Some(normalize_degrees(east.atan2(north).to_degrees()))
}

/// Wrap an angle in degrees into `[0, 360)`.
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round a tiny negative input up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// East/north offsets in radians on the local tangent plane, with longitude wrapped
/// across the antimeridian.
fn local_offsets(from: &RunPoint, to: &RunPoint) -> (f64, f64) {
    let mut delta_lon = to.longitude - from.longitude;
    if delta_lon > 180.0 {
        delta_lon -= 360.0;
    } else if delta_lon < -180.0 {
        delta_lon += 360.0;
    }
    let mean_lat = ((from.latitude + to.latitude) / 2.0).to_radians();
    let east = delta_lon.to_radians() * mean_lat.cos();
    let north = (to.latitude - from.latitude).to_radians();
    (east, north)
}

// =============================================================================
// Center/Centroid Functions
// =============================================================================

/// Arithmetic mean of longitudes and latitudes, as `(longitude, latitude)`.
///
/// Suitable for the extent of a single ski area. Returns `None` for empty input.
pub fn compute_center<'a, I>(points: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a RunPoint>,
{
    let mut sum_lon = 0.0;
    let mut sum_lat = 0.0;
    let mut n = 0usize;
    for p in points {
        sum_lon += p.longitude;
        sum_lat += p.latitude;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some((sum_lon / n as f64, sum_lat / n as f64))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn pt(lon: f64, lat: f64) -> RunPoint {
        RunPoint::without_elevation(lon, lat)
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = pt(10.9, 46.9);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // one hundredth of a degree of latitude is ~1112m everywhere
        let d = haversine_distance(&pt(10.0, 46.0), &pt(10.0, 46.01));
        assert!(approx_eq(d, 1111.95, 1.0));
    }

    #[test]
    fn test_models_agree_at_run_scale() {
        let a = pt(-106.9500, 39.1900);
        let b = pt(-106.9450, 39.1870);
        let h = haversine_distance(&a, &b);
        let e = equirectangular_distance(&a, &b);
        assert!(approx_eq(h, e, 0.01));

        let hb = initial_bearing(DistanceModel::Haversine, &a, &b).unwrap();
        let eb = initial_bearing(DistanceModel::Equirectangular, &a, &b).unwrap();
        assert!(approx_eq(hb, eb, 0.01));
    }

    #[test]
    fn test_cardinal_bearings() {
        let o = pt(0.0, 0.0);
        for model in [DistanceModel::Haversine, DistanceModel::Equirectangular] {
            assert!(approx_eq(initial_bearing(model, &o, &pt(0.0, 0.01)).unwrap(), 0.0, 1e-9));
            assert!(approx_eq(initial_bearing(model, &o, &pt(0.01, 0.0)).unwrap(), 90.0, 1e-9));
            assert!(approx_eq(initial_bearing(model, &o, &pt(0.0, -0.01)).unwrap(), 180.0, 1e-9));
            assert!(approx_eq(initial_bearing(model, &o, &pt(-0.01, 0.0)).unwrap(), 270.0, 1e-9));
        }
    }

    #[test]
    fn test_bearing_in_range_across_antimeridian() {
        let a = pt(179.999, -44.0);
        let b = pt(-179.999, -44.0);
        for model in [DistanceModel::Haversine, DistanceModel::Equirectangular] {
            let bearing = initial_bearing(model, &a, &b).unwrap();
            assert!(approx_eq(bearing, 90.0, 0.01), "{model:?} gave {bearing}");
        }
    }

    #[test]
    fn test_vertical_segment_has_no_bearing() {
        let top = RunPoint::new(7.0, 46.0, 2000.0);
        let bottom = RunPoint::new(7.0, 46.0, 1990.0);
        assert!(initial_bearing(DistanceModel::Haversine, &top, &bottom).is_none());
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert!(normalize_degrees(-1e-18) < 360.0);
    }

    #[test]
    fn test_compute_center() {
        let points = [pt(10.0, 46.0), pt(10.2, 46.2)];
        let (lon, lat) = compute_center(&points).unwrap();
        assert!(approx_eq(lon, 10.1, 1e-9));
        assert!(approx_eq(lat, 46.1, 1e-9));
        assert!(compute_center(&[] as &[RunPoint]).is_none());
    }
}
