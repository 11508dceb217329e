//! Router configuration for the API server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/process", post(handlers::process))
        .route("/api/status/:content_id", get(handlers::status))
        .route("/api/domains", get(handlers::list_domains))
        .route("/webhooks/transcription", post(handlers::transcription_webhook))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
