//! Error taxonomy for indexing and radius queries.

use thiserror::Error;

/// Failures reported by a [`LocationStore`](crate::location::LocationStore) back-end.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),
}

/// Everything that can fail while adding or finding locations.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// Malformed body or query parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid coordinate: lat={lat}, lon={lon} (lat -90..90, lon -180..180)")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("invalid geohash precision {0} (1..=12)")]
    InvalidPrecision(usize),

    #[error("invalid geohash '{0}'")]
    InvalidGeohash(String),

    /// A single cell lookup failed; the whole query is abandoned.
    #[error("query for cell '{cell}' failed: {source}")]
    StoreQuery {
        cell: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to persist location '{id}': {source}")]
    StoreWrite {
        id: String,
        #[source]
        source: StoreError,
    },
}

impl LocatorError {
    /// Short stable name of the error kind, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::InvalidCoordinate { .. } => "InvalidCoordinate",
            Self::InvalidPrecision(_) => "InvalidPrecision",
            Self::InvalidGeohash(_) => "InvalidGeohash",
            Self::StoreQuery { .. } => "StoreQueryError",
            Self::StoreWrite { .. } => "StoreWriteError",
        }
    }
}
