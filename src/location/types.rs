//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};

use crate::error::LocatorError;
use crate::geo::geohash;

/// Body of an add-location request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A persisted location with its derived geohash.
///
/// Built by [`Location::index`]. Deserializing goes through the same path
/// and ignores any `geohash` in the input, so `geohash` always matches the
/// coordinates at [`geohash::MAX_PRECISION`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NewLocation")]
pub struct Location {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    geohash: String,
}

impl Location {
    /// Validate a new location and derive its full-precision geohash.
    pub fn index(new: NewLocation) -> Result<Self, LocatorError> {
        if new.id.trim().is_empty() {
            return Err(LocatorError::InvalidInput("'id' must not be empty".into()));
        }
        let geohash = geohash::encode_full(new.latitude, new.longitude)?;
        Ok(Self {
            id: new.id,
            name: new.name,
            latitude: new.latitude,
            longitude: new.longitude,
            geohash,
        })
    }

    pub fn geohash(&self) -> &str {
        &self.geohash
    }

    /// Index keys for this record: the geohash truncated to every
    /// precision in `precisions`.
    pub fn cell_keys(&self, precisions: std::ops::RangeInclusive<usize>) -> impl Iterator<Item = &str> {
        precisions
            .filter(move |&p| p <= self.geohash.len())
            .map(move |p| &self.geohash[..p])
    }
}

impl TryFrom<NewLocation> for Location {
    type Error = LocatorError;

    fn try_from(new: NewLocation) -> Result<Self, Self::Error> {
        Self::index(new)
    }
}

/// Parameters of a radius query. `radius` is in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryParameters {
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
}

impl QueryParameters {
    pub fn validate(&self) -> Result<(), LocatorError> {
        geohash::validate_coordinate(self.lat, self.lon)?;
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(LocatorError::InvalidInput(format!(
                "radius must be a non-negative number of km, got {}",
                self.radius
            )));
        }
        Ok(())
    }
}
