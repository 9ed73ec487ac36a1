pub mod backend;
pub mod clip;
pub mod convert;
pub mod file;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame, CaptureError, NullBackend};
pub use clip::{AudioClip, AudioSlice, ClipConfig, ClipRecorder};
pub use file::{AudioFile, FileBackend};
