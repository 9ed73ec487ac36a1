//! Remote transcription
//!
//! Record-then-upload recognition backed by an HTTP transcription service:
//! - `TranscriptionClient`: multipart upload and error payload handling
//! - `RemoteRecognizer`: capture lifecycle, clip buffering, single final result

mod client;
mod recognizer;

pub use client::{extract_error_message, language_hint, TranscriptionClient};
pub use recognizer::{RemoteRecognizer, RemoteSettings, RemoteState};
