use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::RecognitionError;

pub type StartCallback = Arc<dyn Fn() + Send + Sync>;

/// Receives the live preview: accumulated text plus the current interim fragment
pub type InterimCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives `(text, is_final)`
pub type ResultCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// Receives the same results as `on_result`, with the provider's confidence
pub type TranscriptCallback = Arc<dyn Fn(&TranscriptEvent) + Send + Sync>;

pub type ErrorCallback = Arc<dyn Fn(&RecognitionError) + Send + Sync>;

pub type EndCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback set supplied by the caller for one session
#[derive(Clone, Default)]
pub struct RecognitionCallbacks {
    pub on_start: Option<StartCallback>,
    pub on_interim_result: Option<InterimCallback>,
    pub on_result: Option<ResultCallback>,
    pub on_transcript: Option<TranscriptCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_end: Option<EndCallback>,
}

impl RecognitionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(f));
        self
    }

    pub fn on_interim_result(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_interim_result = Some(Arc::new(f));
        self
    }

    pub fn on_result(mut self, f: impl Fn(&str, bool) + Send + Sync + 'static) -> Self {
        self.on_result = Some(Arc::new(f));
        self
    }

    pub fn on_transcript(mut self, f: impl Fn(&TranscriptEvent) + Send + Sync + 'static) -> Self {
        self.on_transcript = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&RecognitionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_end(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_end = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for RecognitionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_interim_result", &self.on_interim_result.is_some())
            .field("on_result", &self.on_result.is_some())
            .field("on_transcript", &self.on_transcript.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

/// Options for a single recognition session
#[derive(Debug, Clone)]
pub struct RecognitionOptions {
    /// BCP-47 language tag (e.g., "vi-VN")
    pub language: String,
    /// Keep listening across utterances
    pub continuous: bool,
    /// Report live, non-final fragments
    pub interim_results: bool,
    /// Alternatives requested per segment from the engine
    pub max_alternatives: u32,
    /// Restart the engine after spontaneous termination (continuous mode only)
    pub auto_restart: bool,
    pub callbacks: RecognitionCallbacks,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: "vi-VN".to_string(),
            continuous: true,
            interim_results: true,
            max_alternatives: 3,
            auto_restart: true,
            callbacks: RecognitionCallbacks::default(),
        }
    }
}

impl RecognitionOptions {
    pub fn with_callbacks(mut self, callbacks: RecognitionCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}

/// A single transcript event as seen by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
    /// `None` when the provider does not score its output
    pub confidence: Option<f32>,
}

impl TranscriptEvent {
    pub fn final_text(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence,
        }
    }
}

/// Event queued while adapter state is locked, delivered after the lock is released
#[derive(Debug, Clone)]
pub(crate) enum Outgoing {
    Start,
    Interim(String),
    Result(TranscriptEvent),
    Error(RecognitionError),
    End,
}

/// Caller callbacks of one session plus its terminal flag
///
/// Once `End` has been delivered nothing else is, and `End` itself is
/// delivered at most once.
#[derive(Clone)]
pub(crate) struct Sink {
    callbacks: RecognitionCallbacks,
    ended: Arc<AtomicBool>,
}

impl Sink {
    pub(crate) fn new(callbacks: RecognitionCallbacks) -> Self {
        Self {
            callbacks,
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn outbox(&self) -> Outbox {
        Outbox {
            sink: self.clone(),
            events: Vec::new(),
        }
    }
}

/// Ordered batch of caller notifications for one session
///
/// Adapters fill this under their state lock and deliver it afterwards, so a
/// callback may call back into the adapter (e.g. `stop()` from `on_result`).
pub(crate) struct Outbox {
    sink: Sink,
    events: Vec<Outgoing>,
}

impl Outbox {
    pub(crate) fn push(&mut self, event: Outgoing) {
        self.events.push(event);
    }

    pub(crate) fn with(mut self, event: Outgoing) -> Self {
        self.events.push(event);
        self
    }

    pub(crate) fn deliver(self) {
        let Sink { callbacks, ended } = self.sink;
        for event in self.events {
            if matches!(event, Outgoing::End) {
                if !ended.swap(true, Ordering::SeqCst) {
                    if let Some(cb) = &callbacks.on_end {
                        cb();
                    }
                }
                continue;
            }

            if ended.load(Ordering::SeqCst) {
                break;
            }

            match event {
                Outgoing::Start => {
                    if let Some(cb) = &callbacks.on_start {
                        cb();
                    }
                }
                Outgoing::Interim(text) => {
                    if let Some(cb) = &callbacks.on_interim_result {
                        cb(&text);
                    }
                }
                Outgoing::Result(event) => {
                    if let Some(cb) = &callbacks.on_result {
                        cb(&event.text, event.is_final);
                    }
                    if let Some(cb) = &callbacks.on_transcript {
                        cb(&event);
                    }
                }
                Outgoing::Error(err) => {
                    if let Some(cb) = &callbacks.on_error {
                        cb(&err);
                    }
                }
                Outgoing::End => {}
            }
        }
    }
}
