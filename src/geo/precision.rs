//! Search radius to geohash precision.

/// Coarsest precision the selector returns.
pub const MIN_QUERY_PRECISION: usize = 2;
/// Finest precision the selector returns.
pub const MAX_QUERY_PRECISION: usize = 8;

/// (inclusive lower bound in km, precision), checked top to bottom.
const THRESHOLDS: [(f64, usize); 6] = [
    (5000.0, 2),
    (1250.0, 3),
    (156.0, 4),
    (39.0, 5),
    (5.0, 6),
    (0.625, 7),
];

/// Pick the geohash length to scan for a search of `radius_km`.
///
/// Larger radii get shorter, coarser cells. Anything below the last
/// threshold, including negative or NaN input, falls to the finest level.
pub fn select_precision(radius_km: f64) -> usize {
    THRESHOLDS
        .iter()
        .find(|(min_radius, _)| radius_km >= *min_radius)
        .map(|&(_, precision)| precision)
        .unwrap_or(MAX_QUERY_PRECISION)
}
