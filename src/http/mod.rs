//! HTTP control API
//!
//! A small REST surface over the recognition manager:
//! - GET /providers - Provider descriptors
//! - PUT /recognition/provider - Change the preferred provider
//! - POST /recognition/start - Start a session
//! - POST /recognition/stop - Stop the current session
//! - GET /recognition/status - Listening state and providers
//! - GET /recognition/transcript - Transcript of the current session
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{
    ProviderRequest, StartRecognitionRequest, StartRecognitionResponse, StatusResponse,
};
pub use routes::create_router;
pub use state::AppState;
