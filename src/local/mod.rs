//! Local recognition
//!
//! This module wraps a continuous, interim-capable engine that runs on the
//! device:
//! - `SpeechEngine`: the native listening primitive
//! - `LocalRecognizer`: restart state machine, transcript accumulation,
//!   error policy
//! - `ScriptedEngine`: replays engine events from a JSON script

mod engine;
mod recognizer;
mod scripted;

pub use engine::{
    EngineConfig, EngineErrorCode, EngineEvent, EngineSegment, ErrorClass, SpeechEngine,
};
pub use recognizer::{ListenState, LocalRecognizer, LocalSettings};
pub use scripted::{EngineScript, ScriptStep, ScriptedEngine};
