pub mod audio;
pub mod config;
pub mod http;
pub mod local;
pub mod manager;
pub mod normalize;
pub mod recognition;
pub mod remote;
pub mod session;

pub use audio::{AudioBackend, AudioBackendConfig, AudioFrame, CaptureError, ClipRecorder, FileBackend};
pub use config::Config;
pub use http::{create_router, AppState};
pub use local::{LocalRecognizer, ScriptedEngine, SpeechEngine};
pub use manager::{ProviderPreference, RecognitionManager};
pub use normalize::TextNormalizer;
pub use recognition::{
    ProviderDescriptor, ProviderId, RecognitionCallbacks, RecognitionError, RecognitionOptions,
    SpeechRecognizer, TranscriptEvent,
};
pub use remote::{RemoteRecognizer, TranscriptionClient};
pub use session::{SessionStats, TranscriptFeed, TranscriptSegment};
