use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::recognition::{Alternative, RecognitionError, RecognitionOptions};

/// Settings passed to the engine on every (re)start
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
}

impl From<&RecognitionOptions> for EngineConfig {
    fn from(options: &RecognitionOptions) -> Self {
        Self {
            language: options.language.clone(),
            continuous: options.continuous,
            interim_results: options.interim_results,
            max_alternatives: options.max_alternatives.max(1),
        }
    }
}

/// One recognized segment with its ranked alternatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSegment {
    #[serde(default)]
    pub is_final: bool,
    pub alternatives: Vec<Alternative>,
}

impl EngineSegment {
    pub fn final_text(text: &str, confidence: f32) -> Self {
        Self {
            is_final: true,
            alternatives: vec![Alternative {
                transcript: text.to_string(),
                confidence,
            }],
        }
    }

    pub fn interim_text(text: &str) -> Self {
        Self {
            is_final: false,
            alternatives: vec![Alternative {
                transcript: text.to_string(),
                confidence: 0.0,
            }],
        }
    }
}

/// Events emitted by a running engine
///
/// A closed channel is treated the same as `End`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Results { segments: Vec<EngineSegment> },
    Error { code: EngineErrorCode },
    End,
}

/// How the local adapter reacts to an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Restart, nothing surfaced
    Recoverable,
    /// Surface, stop listening, no restart
    Fatal,
    /// Nothing surfaced
    Silent,
    /// Restart and surface
    Unrecognized,
}

/// Engine error codes (web-speech vocabulary)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineErrorCode {
    NoSpeech,
    Network,
    AudioCapture,
    NotAllowed,
    ServiceNotAllowed,
    Aborted,
    Other(String),
}

impl EngineErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            EngineErrorCode::NoSpeech => "no-speech",
            EngineErrorCode::Network => "network",
            EngineErrorCode::AudioCapture => "audio-capture",
            EngineErrorCode::NotAllowed => "not-allowed",
            EngineErrorCode::ServiceNotAllowed => "service-not-allowed",
            EngineErrorCode::Aborted => "aborted",
            EngineErrorCode::Other(code) => code,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            EngineErrorCode::NoSpeech | EngineErrorCode::Network => ErrorClass::Recoverable,
            EngineErrorCode::AudioCapture
            | EngineErrorCode::NotAllowed
            | EngineErrorCode::ServiceNotAllowed => ErrorClass::Fatal,
            EngineErrorCode::Aborted => ErrorClass::Silent,
            EngineErrorCode::Other(_) => ErrorClass::Unrecognized,
        }
    }

    pub fn to_error(&self) -> RecognitionError {
        match self {
            EngineErrorCode::NoSpeech => RecognitionError::NoSpeech,
            EngineErrorCode::Network => {
                RecognitionError::Network("the speech engine lost its connection".to_string())
            }
            EngineErrorCode::AudioCapture => RecognitionError::AudioCapture(
                "check that a microphone is connected and not used by another application"
                    .to_string(),
            ),
            EngineErrorCode::NotAllowed => RecognitionError::PermissionDenied(
                "Allow microphone access for this application and try again.".to_string(),
            ),
            EngineErrorCode::ServiceNotAllowed => RecognitionError::ServiceUnavailable(
                "the speech service refused the request".to_string(),
            ),
            EngineErrorCode::Aborted => RecognitionError::Engine("aborted".to_string()),
            EngineErrorCode::Other(code) => RecognitionError::Engine(code.clone()),
        }
    }
}

impl From<String> for EngineErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "no-speech" => EngineErrorCode::NoSpeech,
            "network" => EngineErrorCode::Network,
            "audio-capture" => EngineErrorCode::AudioCapture,
            "not-allowed" | "permission-denied" => EngineErrorCode::NotAllowed,
            "service-not-allowed" | "service-unavailable" => EngineErrorCode::ServiceNotAllowed,
            "aborted" => EngineErrorCode::Aborted,
            _ => EngineErrorCode::Other(code),
        }
    }
}

impl From<EngineErrorCode> for String {
    fn from(code: EngineErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native continuous listening primitive wrapped by the local adapter
///
/// Implementations:
/// - `ScriptedEngine`: replays a JSON script (demos, CLI)
/// - platform speech APIs behind the same contract
#[async_trait::async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Whether the engine exists on this system at all
    fn is_available(&self) -> bool;

    /// Start listening
    ///
    /// Returns a channel receiver that will receive engine events until the
    /// engine ends, either spontaneously or after `stop`/`abort`.
    async fn start(
        &self,
        config: &EngineConfig,
    ) -> Result<mpsc::Receiver<EngineEvent>, EngineErrorCode>;

    /// Request a graceful stop. No-op when not running.
    fn stop(&self);

    /// Stop immediately, discarding pending results. No-op when not running.
    fn abort(&self);

    /// Get engine name for logging
    fn name(&self) -> &str;
}
