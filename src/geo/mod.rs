//! Geospatial primitives: geohash codec, precision selection, candidate
//! cells, and haversine filtering.

pub mod cells;
pub mod distance;
pub mod geohash;
pub mod precision;

pub use cells::{enumerate, neighbor, neighbors, CellSet, Direction, Neighbors};
pub use distance::{filter_within, haversine_km, EARTH_RADIUS_KM};
pub use geohash::{decode, decode_bbox, encode, encode_full, BoundingBox, MAX_PRECISION};
pub use precision::{select_precision, MAX_QUERY_PRECISION, MIN_QUERY_PRECISION};
