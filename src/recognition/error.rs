/// Errors reported by recognition adapters
///
/// `Display` output is meant to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecognitionError {
    /// No adapter can run in this environment (configuration error)
    #[error("Speech recognition is not supported: {0}")]
    Unsupported(String),

    #[error("Microphone access was denied. {0}")]
    PermissionDenied(String),

    #[error("No microphone could be used: {0}")]
    AudioCapture(String),

    #[error("The speech service is not available: {0}")]
    ServiceUnavailable(String),

    #[error("No speech was detected. Please try speaking again.")]
    NoSpeech,

    #[error("Network problem during speech recognition: {0}")]
    Network(String),

    #[error("Transcription failed: {message}")]
    Remote { status: Option<u16>, message: String },

    #[error("No audio was recorded. Please try speaking longer or check your microphone.")]
    EmptyRecording,

    #[error("Speech recognition error: {0}")]
    Engine(String),
}

impl RecognitionError {
    /// Permission and hardware failures end the session without retry
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RecognitionError::Unsupported(_)
                | RecognitionError::PermissionDenied(_)
                | RecognitionError::AudioCapture(_)
                | RecognitionError::ServiceUnavailable(_)
        )
    }
}
