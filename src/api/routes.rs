//! Router construction

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    routing::{get, post},
    BoxError, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers;
use crate::error::AppError;
use crate::AppState;

/// Build the gateway's router with its middleware stack
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body = state.settings.server.max_body_bytes;
    let timeout = Duration::from_secs(state.settings.server.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/transform", post(handlers::transform))
        .route("/api/transform/image", post(handlers::transform))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(timeout),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Render a timed-out request in the same failure envelope as every other error
async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::Timeout("request took too long to complete".to_string())
    } else {
        AppError::Internal(err.to_string())
    }
}
