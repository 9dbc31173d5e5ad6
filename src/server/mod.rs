mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use std::io;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use handlers::{ADDED_MESSAGE, FAILURE_MESSAGE};
pub use state::AppState;

use crate::locator::Locator;

pub fn build_router(locator: Locator) -> Router {
    let state = Arc::new(AppState { locator });

    Router::new()
        .route(
            "/api/locations",
            get(handlers::find_locations).post(handlers::add_location),
        )
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until the process is stopped.
pub async fn start(bind_addr: &str, locator: Locator) -> io::Result<()> {
    let app = build_router(locator);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("Geohash locator listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
