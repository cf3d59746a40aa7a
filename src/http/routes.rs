//! Axum router configuration

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{health_check, index, version_check};
use super::record::record;

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        .route("/record", get(record))
        .layer(TraceLayer::new_for_http());

    let router = if state.config.cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}
