use super::state::AppState;
use crate::manager::ProviderPreference;
use crate::recognition::{ProviderDescriptor, ProviderId, RecognitionError};
use crate::session::SessionStats;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartRecognitionRequest {
    /// Language tag override (e.g., "vi-VN")
    pub language: Option<String>,

    /// Keep listening across utterances
    pub continuous: Option<bool>,

    /// Report interim previews
    pub interim_results: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRecognitionResponse {
    pub session_id: String,
    pub provider: ProviderId,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// "auto", "local" or "remote"
    pub provider: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub preferred: ProviderPreference,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopRecognitionResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub listening: bool,
    pub provider: Option<ProviderId>,
    pub preferred: ProviderPreference,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /providers
/// List registered providers with their live support flag
pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderDescriptor>> {
    Json(state.manager.get_available_providers())
}

/// PUT /recognition/provider
/// Change the preferred provider for the next session
pub async fn set_provider(
    State(state): State<AppState>,
    Json(req): Json<ProviderRequest>,
) -> impl IntoResponse {
    match req.provider.parse::<ProviderPreference>() {
        Ok(preferred) => {
            state.manager.set_preferred_provider(preferred);
            (StatusCode::OK, Json(ProviderResponse { preferred })).into_response()
        }
        Err(e) => {
            warn!("Rejected provider change: {}", e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

/// POST /recognition/start
/// Start a session, stopping any live one
pub async fn start_recognition(
    State(state): State<AppState>,
    Json(req): Json<StartRecognitionRequest>,
) -> impl IntoResponse {
    let mut options = state.defaults.options();
    if let Some(language) = req.language {
        options.language = language;
    }
    if let Some(continuous) = req.continuous {
        options.continuous = continuous;
    }
    if let Some(interim_results) = req.interim_results {
        options.interim_results = interim_results;
    }

    let session_id = state.feed.begin();
    let options = options.with_callbacks(state.feed.callbacks());
    info!("Starting recognition session {}", session_id);

    match state.manager.start(options).await {
        Ok(provider) => {
            state.feed.set_provider(provider);
            let status = if state.feed.is_ended() {
                "ended"
            } else if state.manager.is_listening() {
                "listening"
            } else {
                "starting"
            };

            (
                StatusCode::OK,
                Json(StartRecognitionResponse {
                    session_id,
                    provider,
                    status: status.to_string(),
                }),
            )
                .into_response()
        }
        Err(e @ RecognitionError::Unsupported(_)) => {
            warn!("No provider available: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => {
            error!("Failed to start recognition: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /recognition/stop
/// Stop the current session (no-op without one)
pub async fn stop_recognition(State(state): State<AppState>) -> impl IntoResponse {
    let listening = state.manager.is_listening();
    state.manager.stop();
    let status = if listening { "stopping" } else { "idle" };

    (
        StatusCode::OK,
        Json(StopRecognitionResponse {
            status: status.to_string(),
        }),
    )
}

/// GET /recognition/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        listening: state.manager.is_listening(),
        provider: state.manager.current_provider(),
        preferred: state.manager.preferred_provider(),
        stats: state.feed.stats(),
    })
}

/// GET /recognition/transcript
/// Transcript of the session started through this API
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.feed.snapshot()))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
