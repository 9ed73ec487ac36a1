use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::RecognitionError;
use super::options::RecognitionOptions;

/// Identifier of a recognition provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Continuous, interim-capable engine available on the device
    Local,
    /// Record-then-upload transcription service (paid, needs a credential)
    Remote,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Local => "local",
            ProviderId::Remote => "remote",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = RecognitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ProviderId::Local),
            "remote" => Ok(ProviderId::Remote),
            other => Err(RecognitionError::Unsupported(format!(
                "unknown provider '{other}' (expected 'local' or 'remote')"
            ))),
        }
    }
}

/// Static description of a provider, used for ranking and reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    /// Human-readable provider name
    pub name: String,
    /// Whether the provider can start a session right now
    pub supported: bool,
    /// Rough accuracy estimate (0.0 to 1.0)
    pub accuracy: f32,
    /// Rough time from end of speech to final text, in milliseconds
    pub latency_ms: u32,
}

/// Capability contract shared by every recognition adapter
///
/// Ordering rules every implementation follows:
/// - `on_start` fires before any transcript callback of the session
/// - post-start failures go through `on_error`, never through `start`'s result
/// - `on_end` fires exactly once per session, and nothing fires after it
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Synchronous, side-effect-free capability check
    fn is_supported(&self) -> bool;

    /// Begin a session
    ///
    /// Only a pre-flight capability failure is returned as `Err`; everything
    /// after that is reported through the callbacks in `options`.
    async fn start(&self, options: RecognitionOptions) -> Result<(), RecognitionError>;

    /// Stop the current session. Idempotent.
    fn stop(&self);

    fn is_listening(&self) -> bool;

    fn name(&self) -> &str;

    fn accuracy(&self) -> f32;

    /// Estimated latency in milliseconds
    fn speed(&self) -> u32;

    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            id: self.id(),
            name: self.name().to_string(),
            supported: self.is_supported(),
            accuracy: self.accuracy(),
            latency_ms: self.speed(),
        }
    }
}
