use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Provider selection
        .route("/providers", get(handlers::list_providers))
        .route("/recognition/provider", put(handlers::set_provider))
        // Session control
        .route("/recognition/start", post(handlers::start_recognition))
        .route("/recognition/stop", post(handlers::stop_recognition))
        // Session queries
        .route("/recognition/status", get(handlers::get_status))
        .route("/recognition/transcript", get(handlers::get_transcript))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
