use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a recognition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether the session is between `on_start` and `on_end`
    pub is_listening: bool,

    /// When the session was started
    pub started_at: DateTime<Utc>,

    /// Time since start in seconds (frozen once the session ended)
    pub duration_secs: f64,

    /// Number of final transcript segments received
    pub transcript_segments_count: usize,

    /// Number of interim previews received
    pub interim_updates: usize,

    /// Number of errors reported
    pub error_count: usize,
}

/// A single final transcript segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Normalized text
    pub text: String,

    /// When this segment was received
    pub timestamp: DateTime<Utc>,

    /// Confidence score (0.0 to 1.0), if the provider reports one
    pub confidence: Option<f32>,
}
