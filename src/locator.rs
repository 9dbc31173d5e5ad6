//! Write and radius-query pipelines over a [`LocationStore`].
//!
//! Query flow: radius → precision → 3×3 candidate cells → one concurrent
//! lookup per cell → merged candidates → haversine filter.

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{LocatorError, StoreError};
use crate::geo::{enumerate, filter_within, select_precision, CellSet};
use crate::location::{Location, LocationStore, NewLocation, QueryParameters};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Adds locations and answers radius queries against a shared store.
#[derive(Clone)]
pub struct Locator {
    store: Arc<dyn LocationStore>,
    query_timeout: Duration,
}

impl Locator {
    pub fn new(store: Arc<dyn LocationStore>) -> Self {
        Self {
            store,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Deadline for the whole cell fan-out of one query.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn LocationStore> {
        &self.store
    }

    /// Index a new location at full geohash precision and persist it.
    pub async fn add_location(&self, new: NewLocation) -> Result<Location, LocatorError> {
        let location = Location::index(new)?;
        self.store
            .put(location.clone())
            .await
            .map_err(|source| LocatorError::StoreWrite {
                id: location.id.clone(),
                source,
            })?;

        tracing::debug!(id = %location.id, geohash = location.geohash(), "location stored");
        Ok(location)
    }

    /// The cells a query scans: precision from the radius, then the cell
    /// holding the center plus its eight neighbors.
    pub fn candidate_cells(params: &QueryParameters) -> Result<CellSet, LocatorError> {
        params.validate()?;
        enumerate(params.lat, params.lon, select_precision(params.radius))
    }

    /// All stored locations within `params.radius` km of the center,
    /// nearest first.
    pub async fn find_locations(&self, params: QueryParameters) -> Result<Vec<Location>, LocatorError> {
        let start = Instant::now();
        let cells = Self::candidate_cells(&params)?;
        let scan = cells.distinct();

        let candidates = match tokio::time::timeout(self.query_timeout, self.query_cells(&scan)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(LocatorError::StoreQuery {
                    cell: cells.center.clone(),
                    source: StoreError::Timeout(self.query_timeout.as_millis() as u64),
                })
            }
        };
        let scanned = candidates.len();
        let found = filter_within(candidates, params.lat, params.lon, params.radius);

        tracing::debug!(
            lat = params.lat,
            lon = params.lon,
            radius_km = params.radius,
            precision = cells.precision,
            cells = scan.len(),
            candidates = scanned,
            matched = found.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "radius query"
        );
        Ok(found)
    }

    /// Look up every cell concurrently and concatenate the results in cell
    /// order. The first failing lookup fails the whole call.
    pub async fn query_cells(&self, cells: &[String]) -> Result<Vec<Location>, LocatorError> {
        let lookups = cells.iter().map(|cell| async move {
            self.store
                .query_cell(cell)
                .await
                .map_err(|source| LocatorError::StoreQuery {
                    cell: cell.clone(),
                    source,
                })
        });

        let per_cell = try_join_all(lookups).await?;
        Ok(per_cell.into_iter().flatten().collect())
    }
}
