use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::stats::{SessionStats, TranscriptSegment};
use crate::normalize::TextNormalizer;
use crate::recognition::{ProviderId, RecognitionCallbacks, RecognitionError, TranscriptEvent};

/// Point-in-time view of the tracked session
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptSnapshot {
    pub session_id: String,
    pub provider: Option<ProviderId>,
    pub started_at: DateTime<Utc>,
    pub listening: bool,
    pub interim: String,
    pub segments: Vec<TranscriptSegment>,
    /// Final segments joined and normalized as one transcript
    pub final_text: String,
    pub last_error: Option<String>,
    pub ended: bool,
}

struct FeedState {
    session_id: String,
    provider: Option<ProviderId>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    listening: bool,
    interim: String,
    interim_updates: usize,
    segments: Vec<TranscriptSegment>,
    errors: Vec<String>,
    ended: bool,
}

impl FeedState {
    fn fresh() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            provider: None,
            started_at: Utc::now(),
            ended_at: None,
            listening: false,
            interim: String::new(),
            interim_updates: 0,
            segments: Vec::new(),
            errors: Vec::new(),
            ended: false,
        }
    }

    fn joined(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Collects one session's callbacks into a snapshot
///
/// `begin` starts tracking a new session; callbacks handed out for an
/// earlier session are ignored from then on.
#[derive(Clone)]
pub struct TranscriptFeed {
    state: Arc<Mutex<FeedState>>,
    /// Re-applied over the joined segments; corrections may span them
    normalizer: Arc<TextNormalizer>,
}

impl TranscriptFeed {
    pub fn new(normalizer: Arc<TextNormalizer>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState::fresh())),
            normalizer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset for a new session and return its id
    pub fn begin(&self) -> String {
        let mut state = self.lock();
        *state = FeedState::fresh();
        info!("Tracking transcript for session {}", state.session_id);
        state.session_id.clone()
    }

    pub fn set_provider(&self, provider: ProviderId) {
        self.lock().provider = Some(provider);
    }

    pub fn session_id(&self) -> String {
        self.lock().session_id.clone()
    }

    /// Callbacks that record into this feed for the current session
    pub fn callbacks(&self) -> RecognitionCallbacks {
        let session_id = self.session_id();

        let on_start = self.recorder(&session_id, |state| {
            state.listening = true;
        });

        let on_interim = self.recorder_with(&session_id, |state, text: &str| {
            state.interim = text.to_string();
            state.interim_updates += 1;
        });

        let on_transcript = {
            let feed = self.clone();
            let session_id = session_id.clone();
            move |event: &TranscriptEvent| {
                feed.update(&session_id, |state| {
                    if event.is_final {
                        debug!("Final segment: {}", event.text);
                        state.segments.push(TranscriptSegment {
                            text: event.text.clone(),
                            timestamp: Utc::now(),
                            confidence: event.confidence,
                        });
                        state.interim.clear();
                    } else {
                        state.interim = event.text.clone();
                        state.interim_updates += 1;
                    }
                });
            }
        };

        let on_error = {
            let feed = self.clone();
            let session_id = session_id.clone();
            move |err: &RecognitionError| {
                feed.update(&session_id, |state| state.errors.push(err.to_string()));
            }
        };

        let on_end = self.recorder(&session_id, |state| {
            state.listening = false;
            state.ended = true;
            state.ended_at = Some(Utc::now());
            state.interim.clear();
        });

        RecognitionCallbacks::new()
            .on_start(on_start)
            .on_interim_result(on_interim)
            .on_transcript(on_transcript)
            .on_error(on_error)
            .on_end(on_end)
    }

    fn update(&self, session_id: &str, f: impl FnOnce(&mut FeedState)) {
        let mut state = self.lock();
        if state.session_id != session_id {
            debug!("Ignoring event for superseded session {}", session_id);
            return;
        }
        f(&mut state);
    }

    fn recorder(
        &self,
        session_id: &str,
        f: impl Fn(&mut FeedState) + Send + Sync + 'static,
    ) -> impl Fn() + Send + Sync + 'static {
        let feed = self.clone();
        let session_id = session_id.to_string();
        move || feed.update(&session_id, &f)
    }

    fn recorder_with(
        &self,
        session_id: &str,
        f: impl Fn(&mut FeedState, &str) + Send + Sync + 'static,
    ) -> impl Fn(&str) + Send + Sync + 'static {
        let feed = self.clone();
        let session_id = session_id.to_string();
        move |text: &str| feed.update(&session_id, |state| f(state, text))
    }

    /// The normalized transcript handed downstream
    pub fn final_text(&self) -> String {
        let joined = self.lock().joined();
        self.normalizer.normalize(&joined)
    }

    pub fn is_listening(&self) -> bool {
        self.lock().listening
    }

    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().errors.last().cloned()
    }

    pub fn segments(&self) -> Vec<TranscriptSegment> {
        self.lock().segments.clone()
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        let state = self.lock();
        TranscriptSnapshot {
            session_id: state.session_id.clone(),
            provider: state.provider,
            started_at: state.started_at,
            listening: state.listening,
            interim: state.interim.clone(),
            segments: state.segments.clone(),
            final_text: self.normalizer.normalize(&state.joined()),
            last_error: state.errors.last().cloned(),
            ended: state.ended,
        }
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.lock();
        let until = state.ended_at.unwrap_or_else(Utc::now);
        let duration = until.signed_duration_since(state.started_at);

        SessionStats {
            is_listening: state.listening,
            started_at: state.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            transcript_segments_count: state.segments.len(),
            interim_updates: state.interim_updates,
            error_count: state.errors.len(),
        }
    }
}

impl Default for TranscriptFeed {
    fn default() -> Self {
        Self::new(Arc::new(TextNormalizer::default()))
    }
}
