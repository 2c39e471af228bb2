//! Route geometry primitives.
//!
//! Great-circle distances, path simplification, and zone-boundary
//! crossing search over raw coordinate sequences. Everything here is
//! pure computation; polyline string codecs live in [`crate::polyline`].

use serde::{Deserialize, Serialize};

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle (haversine) distance between two points in kilometers.
///
/// Symmetric, and ~0 for coincident points.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Sum of consecutive segment distances along a path, in kilometers.
///
/// Zero for paths of fewer than two points.
pub fn path_distance_km(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// Drops interior points closer than `threshold_km` to the last kept point.
///
/// The first and last points are always retained, so the result never
/// grows and never loses the path endpoints.
pub fn simplify(points: &[GeoPoint], threshold_km: f64) -> Vec<GeoPoint> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut kept = vec![points[0]];
    for point in &points[1..points.len() - 1] {
        let last = kept[kept.len() - 1];
        if haversine_km(last, *point) >= threshold_km {
            kept.push(*point);
        }
    }
    kept.push(points[points.len() - 1]);
    kept
}

/// Binary search along the segment `a -> b` for the point where
/// `predicate` flips (e.g. a pricing-zone boundary crossing).
///
/// Assumes `predicate(a) != predicate(b)`; if the segment is already
/// shorter than `tolerance_km` the midpoint is returned directly. The
/// result always lies within the bounding coordinates of `a` and `b`.
pub fn find_crossing<F>(a: GeoPoint, b: GeoPoint, predicate: F, tolerance_km: f64) -> GeoPoint
where
    F: Fn(GeoPoint) -> bool,
{
    let mut lo = a;
    let mut hi = b;
    let side = predicate(a);

    while haversine_km(lo, hi) > tolerance_km {
        let mid = midpoint(lo, hi);
        if predicate(mid) == side {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    midpoint(lo, hi)
}

fn midpoint(a: GeoPoint, b: GeoPoint) -> GeoPoint {
    GeoPoint::new((a.lat + b.lat) / 2.0, (a.lng + b.lng) / 2.0)
}
