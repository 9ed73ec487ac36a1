//! Recognition capability contract
//!
//! This module defines what every recognition engine adapter must provide:
//! - A synchronous capability check and static descriptive metadata
//! - An asynchronous `start` that reports everything through callbacks
//! - An idempotent `stop` that guarantees exactly one `on_end`
//! - Transcript accumulation shared by the adapters

mod contract;
mod error;
mod options;
mod transcript;

pub use contract::{ProviderDescriptor, ProviderId, SpeechRecognizer};
pub use error::RecognitionError;
pub use options::{
    EndCallback, ErrorCallback, InterimCallback, RecognitionCallbacks, RecognitionOptions,
    ResultCallback, StartCallback, TranscriptCallback, TranscriptEvent,
};
pub use transcript::{best_alternative, Alternative, TranscriptAccumulator};

pub(crate) use options::{Outbox, Outgoing, Sink};
