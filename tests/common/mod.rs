// Shared test doubles
//
// - MockEngine: a SpeechEngine driven by the test, counting held handles
//   (optionally releasing them some time after stop/abort)
// - MockCapture: an AudioBackend counting acquire/release pairs
// - StubRecognizer: a SpeechRecognizer that hands its callbacks to the test
// - Recorder: a callback set that records every event in order

#![allow(dead_code)]

use anyhow::Result;
use speech_entry::audio::{AudioBackend, AudioFrame, CaptureError};
use speech_entry::local::{EngineConfig, EngineErrorCode, EngineEvent, EngineSegment, SpeechEngine};
use speech_entry::recognition::{
    ProviderId, RecognitionCallbacks, RecognitionError, RecognitionOptions, SpeechRecognizer,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Event recorder
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Interim(String),
    Result(String, bool),
    Error(RecognitionError),
    End,
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn callbacks(&self) -> RecognitionCallbacks {
        let (a, b, c, d, e) = (
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
        );
        RecognitionCallbacks::new()
            .on_start(move || a.push(Event::Start))
            .on_interim_result(move |text| b.push(Event::Interim(text.to_string())))
            .on_result(move |text, is_final| c.push(Event::Result(text.to_string(), is_final)))
            .on_error(move |err| d.push(Event::Error(err.clone())))
            .on_end(move || e.push(Event::End))
    }

    pub fn options(&self) -> RecognitionOptions {
        RecognitionOptions::default().with_callbacks(self.callbacks())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn ends(&self) -> usize {
        self.events().iter().filter(|e| **e == Event::End).count()
    }

    pub fn errors(&self) -> Vec<RecognitionError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn finals(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Result(text, true) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn interims(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Interim(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Poll until `on_end` was observed (real-time tests)
    pub async fn wait_for_end(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.ends() > 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.ends() > 0
    }
}

/// Let spawned tasks run (paused-clock tests advance automatically)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ============================================================================
// Mock speech engine
// ============================================================================

#[derive(Default)]
struct EngineState {
    tx: Option<mpsc::Sender<EngineEvent>>,
    starts: usize,
    held: usize,
    max_held: usize,
    stops: usize,
    aborts: usize,
    fail_next: VecDeque<EngineErrorCode>,
    configs: Vec<EngineConfig>,
}

impl EngineState {
    fn release(&mut self) {
        if self.tx.take().is_some() {
            self.held -= 1;
        }
    }
}

pub struct MockEngine {
    available: AtomicBool,
    state: Arc<Mutex<EngineState>>,
    release_delay: Duration,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Self::slow_release(Duration::ZERO)
    }

    /// `stop` and `abort` free the handle only after `delay`
    pub fn slow_release(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            state: Arc::new(Mutex::new(EngineState::default())),
            release_delay: delay,
        })
    }

    fn release_handle(&self) {
        let mut state = self.state.lock().unwrap();
        if self.release_delay.is_zero() {
            state.release();
            return;
        }

        // Events stop at once, the device stays held until the delay passes
        if state.tx.take().is_some() {
            let shared = Arc::clone(&self.state);
            let delay = self.release_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                shared.lock().unwrap().held -= 1;
            });
        }
    }

    pub fn unavailable() -> Arc<Self> {
        let engine = Self::new();
        engine.available.store(false, Ordering::SeqCst);
        engine
    }

    pub fn fail_next_start(&self, code: EngineErrorCode) {
        self.state.lock().unwrap().fail_next.push_back(code);
    }

    pub fn emit(&self, event: EngineEvent) -> bool {
        let state = self.state.lock().unwrap();
        match &state.tx {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        }
    }

    pub fn final_result(&self, text: &str) -> bool {
        self.emit(EngineEvent::Results {
            segments: vec![EngineSegment::final_text(text, 0.9)],
        })
    }

    pub fn interim(&self, text: &str) -> bool {
        self.emit(EngineEvent::Results {
            segments: vec![EngineSegment::interim_text(text)],
        })
    }

    pub fn error(&self, code: &str) -> bool {
        self.emit(EngineEvent::Error {
            code: EngineErrorCode::from(code.to_string()),
        })
    }

    /// Spontaneous end: the engine releases its handle on its own
    pub fn end(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let sent = match &state.tx {
            Some(tx) => tx.try_send(EngineEvent::End).is_ok(),
            None => false,
        };
        state.release();
        sent
    }

    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub fn held(&self) -> usize {
        self.state.lock().unwrap().held
    }

    pub fn max_held(&self) -> usize {
        self.state.lock().unwrap().max_held
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn aborts(&self) -> usize {
        self.state.lock().unwrap().aborts
    }

    pub fn configs(&self) -> Vec<EngineConfig> {
        self.state.lock().unwrap().configs.clone()
    }
}

#[async_trait::async_trait]
impl SpeechEngine for MockEngine {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn start(
        &self,
        config: &EngineConfig,
    ) -> Result<mpsc::Receiver<EngineEvent>, EngineErrorCode> {
        let mut state = self.state.lock().unwrap();
        state.starts += 1;
        state.configs.push(config.clone());

        if let Some(code) = state.fail_next.pop_front() {
            return Err(code);
        }

        let (tx, rx) = mpsc::channel(64);
        if state.tx.replace(tx).is_none() {
            state.held += 1;
        }
        state.max_held = state.max_held.max(state.held);
        Ok(rx)
    }

    fn stop(&self) {
        self.state.lock().unwrap().stops += 1;
        self.release_handle();
    }

    fn abort(&self) {
        self.state.lock().unwrap().aborts += 1;
        self.release_handle();
    }

    fn name(&self) -> &str {
        "Mock engine"
    }
}

// ============================================================================
// Mock capture backend
// ============================================================================

/// Counters shared between a boxed MockCapture and the test
#[derive(Default)]
pub struct CaptureStats {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub held: AtomicUsize,
    pub max_held: AtomicUsize,
}

impl CaptureStats {
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    pub fn max_held(&self) -> usize {
        self.max_held.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct MockCapture {
    stats: Arc<CaptureStats>,
    frames: Vec<AudioFrame>,
    deny_permission: bool,
    /// Successful acquisitions allowed before permission is denied
    allowed: Option<usize>,
    start_delay: Duration,
    fail_stop: bool,
    tx: Option<mpsc::Sender<AudioFrame>>,
}

impl MockCapture {
    /// Delivers `frames` on every start, then stays open until stopped
    pub fn new(frames: Vec<AudioFrame>) -> (Self, Arc<CaptureStats>) {
        let stats = Arc::new(CaptureStats::default());
        (
            Self {
                stats: Arc::clone(&stats),
                frames,
                deny_permission: false,
                allowed: None,
                start_delay: Duration::ZERO,
                fail_stop: false,
                tx: None,
            },
            stats,
        )
    }

    pub fn denying_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Grant `allowed` acquisitions, then deny permission
    pub fn denying_after(mut self, allowed: usize) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Every `start` takes `delay` before it grants or denies access
    pub fn slow_start(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// `stop` releases the device but reports an error
    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }
}

#[async_trait::async_trait]
impl AudioBackend for MockCapture {
    fn is_available(&self) -> bool {
        true
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        let exhausted = self
            .allowed
            .is_some_and(|allowed| self.stats.starts() >= allowed);
        if self.deny_permission || exhausted {
            return Err(CaptureError::PermissionDenied("user declined".to_string()));
        }

        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        let held = self.stats.held.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_held.fetch_max(held, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(self.frames.len() + 1);
        for frame in &self.frames {
            let _ = tx.try_send(frame.clone());
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        if self.tx.take().is_some() {
            self.stats.held.fetch_sub(1, Ordering::SeqCst);
        }
        if self.fail_stop {
            anyhow::bail!("recorder reported an error while stopping");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "Mock capture"
    }
}

/// `count` frames of 100ms, 16kHz mono
pub fn speech_frames(count: usize) -> Vec<AudioFrame> {
    (0..count)
        .map(|i| AudioFrame {
            samples: vec![(i as i16 % 7) * 100; 1600],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: i as u64 * 100,
        })
        .collect()
}

// ============================================================================
// Stub recognizer
// ============================================================================

pub struct StubRecognizer {
    id: ProviderId,
    supported: AtomicBool,
    listening: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    sessions: Mutex<Vec<RecognitionCallbacks>>,
}

impl StubRecognizer {
    pub fn new(id: ProviderId, supported: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            supported: AtomicBool::new(supported),
            listening: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
        })
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    /// Callbacks the stub was started with, oldest first
    pub fn session(&self, index: usize) -> RecognitionCallbacks {
        self.sessions.lock().unwrap()[index].clone()
    }

    pub fn latest(&self) -> RecognitionCallbacks {
        self.sessions.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for StubRecognizer {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    async fn start(&self, options: RecognitionOptions) -> Result<(), RecognitionError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(cb) = &options.callbacks.on_start {
            cb();
        }
        self.sessions.lock().unwrap().push(options.callbacks);
        self.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.listening.swap(false, Ordering::SeqCst) {
            if let Some(cb) = &self.latest().on_end {
                cb();
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        match self.id {
            ProviderId::Local => "Stub local",
            ProviderId::Remote => "Stub remote",
        }
    }

    fn accuracy(&self) -> f32 {
        0.5
    }

    fn speed(&self) -> u32 {
        100
    }
}
