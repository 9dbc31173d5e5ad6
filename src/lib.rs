//! Radius search over point locations using geohash cell bucketing.
//!
//! Locations are written with a full-precision geohash. A query picks a
//! coarser precision from its radius, scans the cell holding the center and
//! its eight neighbors, and keeps the candidates whose haversine distance is
//! within the radius.

pub mod client;
pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod locator;
pub mod server;

pub use error::{LocatorError, StoreError};
pub use locator::Locator;
