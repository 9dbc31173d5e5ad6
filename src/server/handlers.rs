use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LocatorError;
use crate::location::{Location, NewLocation, QueryParameters};

use super::state::AppState;

pub const ADDED_MESSAGE: &str = "Location added successfully";
pub const FAILURE_MESSAGE: &str = "An error occurred while processing your request";

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

/// Every failure leaves the service as the same opaque 500; the detail
/// only goes to the log.
pub struct ApiError(LocatorError);

impl From<LocatorError> for ApiError {
    fn from(err: LocatorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        let body = MessageBody {
            message: FAILURE_MESSAGE,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// ─── POST /api/locations ─────────────────────────────────────────

pub async fn add_location(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MessageBody>, ApiError> {
    let new: NewLocation = serde_json::from_slice(&body)
        .map_err(|e| LocatorError::InvalidInput(format!("request body: {}", e)))?;

    let location = state.locator.add_location(new).await?;
    tracing::info!(id = %location.id, geohash = location.geohash(), "POST /api/locations");

    Ok(Json(MessageBody {
        message: ADDED_MESSAGE,
    }))
}

// ─── GET /api/locations ──────────────────────────────────────────

pub async fn find_locations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Vec<Location>>, ApiError> {
    let Query(raw) = query.map_err(|e| LocatorError::InvalidInput(e.body_text()))?;
    let params = QueryParameters {
        lat: parse_param(&raw, "lat")?,
        lon: parse_param(&raw, "lon")?,
        radius: parse_param(&raw, "radius")?,
    };

    let found = state.locator.find_locations(params).await?;
    tracing::info!(
        lat = params.lat,
        lon = params.lon,
        radius_km = params.radius,
        matched = found.len(),
        "GET /api/locations"
    );

    Ok(Json(found))
}

// ─── GET /api/health ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<usize>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    match state.locator.store().len().await {
        Ok(n) => Json(HealthResponse {
            status: "ok",
            locations: Some(n),
        }),
        Err(e) => {
            tracing::warn!(error = %e, "store unavailable for health check");
            Json(HealthResponse {
                status: "degraded",
                locations: None,
            })
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

fn parse_param(raw: &HashMap<String, String>, name: &str) -> Result<f64, LocatorError> {
    let value = raw
        .get(name)
        .ok_or_else(|| LocatorError::InvalidInput(format!("missing '{}' parameter", name)))?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| LocatorError::InvalidInput(format!("'{}'={:?}: {}", name, value, e)))
}
