//! Great-circle distance and the radius post-filter.

use std::f64::consts::PI;

use crate::location::Location;

/// Mean Earth radius used for all distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const DEG: f64 = PI / 180.0;

/// Haversine distance in kilometers between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1) * DEG;
    let d_lon = (lon2 - lon1) * DEG;

    let a = (d_lat / 2.0).sin().powi(2)
        + (lat1 * DEG).cos() * (lat2 * DEG).cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Keep only candidates within `radius_km` of (lat, lon), nearest first.
///
/// Equal distances keep their input order.
pub fn filter_within(candidates: Vec<Location>, lat: f64, lon: f64, radius_km: f64) -> Vec<Location> {
    let mut kept: Vec<(f64, Location)> = candidates
        .into_iter()
        .map(|loc| (haversine_km(lat, lon, loc.latitude, loc.longitude), loc))
        .filter(|(d, _)| *d <= radius_km)
        .collect();
    kept.sort_by(|a, b| a.0.total_cmp(&b.0));
    kept.into_iter().map(|(_, loc)| loc).collect()
}
