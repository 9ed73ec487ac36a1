use crate::config::RecognitionConfig;
use crate::manager::RecognitionManager;
use crate::session::TranscriptFeed;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single recognition surface
    pub manager: Arc<RecognitionManager>,

    /// Transcript of the session started through the API
    pub feed: TranscriptFeed,

    /// Session defaults that start requests may override
    pub defaults: RecognitionConfig,
}

impl AppState {
    pub fn new(manager: Arc<RecognitionManager>, defaults: RecognitionConfig) -> Self {
        Self {
            feed: TranscriptFeed::new(Arc::clone(manager.normalizer())),
            manager,
            defaults,
        }
    }
}
