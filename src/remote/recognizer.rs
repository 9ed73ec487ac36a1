use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::TranscriptionClient;
use crate::audio::{AudioBackend, ClipConfig, ClipRecorder};
use crate::config::RemoteConfig;
use crate::normalize::TextNormalizer;
use crate::recognition::{
    Outgoing, ProviderId, RecognitionError, RecognitionOptions, Sink, SpeechRecognizer,
    TranscriptEvent,
};

/// Buffering settings for the remote adapter
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub clip: ClipConfig,
    /// How long `stop` waits for in-flight frames after releasing capture
    pub drain_timeout: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            clip: ClipConfig::default(),
            drain_timeout: Duration::from_millis(500),
        }
    }
}

impl From<&RemoteConfig> for RemoteSettings {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            clip: ClipConfig {
                slice_duration_ms: config.slice_ms,
            },
            drain_timeout: Duration::from_millis(config.drain_timeout_ms),
        }
    }
}

/// Recording state of the remote adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    Idle,
    Recording,
    Uploading,
}

type CaptureHandle = OwnedMutexGuard<Box<dyn AudioBackend>>;

struct Session {
    id: u64,
    language: String,
    sink: Sink,
    recorder: Arc<Mutex<ClipRecorder>>,
    /// Held while recording; dropping it releases the capture hardware
    capture: Option<CaptureHandle>,
    collector: Option<JoinHandle<()>>,
}

struct Inner {
    state: RemoteState,
    session: Option<Session>,
    next_id: u64,
    uploads_in_flight: usize,
}

impl Inner {
    /// State once no session is recording
    fn settle(&mut self) {
        self.state = if self.uploads_in_flight > 0 {
            RemoteState::Uploading
        } else {
            RemoteState::Idle
        };
    }
}

struct Shared {
    backend: Arc<tokio::sync::Mutex<Box<dyn AudioBackend>>>,
    capture_available: bool,
    client: Option<TranscriptionClient>,
    normalizer: Arc<TextNormalizer>,
    settings: RemoteSettings,
    inner: Mutex<Inner>,
    start_lock: tokio::sync::Mutex<()>,
}

/// Record-then-upload adapter: single shot, final results only
///
/// States: `Idle → Recording → Uploading → Idle`. `stop` finalizes the
/// buffered audio into one clip, releases the capture hardware even if the
/// recorder fails to stop, and uploads the clip. Transport and service
/// failures are reported through `on_error`, followed by `on_end`.
pub struct RemoteRecognizer {
    shared: Arc<Shared>,
}

fn lock_recorder(recorder: &Mutex<ClipRecorder>) -> MutexGuard<'_, ClipRecorder> {
    recorder.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RemoteRecognizer {
    pub fn new(
        backend: Box<dyn AudioBackend>,
        client: Option<TranscriptionClient>,
        normalizer: Arc<TextNormalizer>,
        settings: RemoteSettings,
    ) -> Self {
        let capture_available = backend.is_available();
        info!(
            "Remote recognizer initialized: capture={} ({}), credential={}",
            backend.name(),
            if capture_available { "available" } else { "unavailable" },
            if client.is_some() { "present" } else { "missing" }
        );

        Self {
            shared: Arc::new(Shared {
                backend: Arc::new(tokio::sync::Mutex::new(backend)),
                capture_available,
                client,
                normalizer,
                settings,
                inner: Mutex::new(Inner {
                    state: RemoteState::Idle,
                    session: None,
                    next_id: 0,
                    uploads_in_flight: 0,
                }),
                start_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> RemoteState {
        self.shared.lock().state
    }

    /// Slices buffered so far in the current recording
    pub fn buffered_slices(&self) -> usize {
        self.shared
            .lock()
            .session
            .as_ref()
            .map(|s| lock_recorder(&s.recorder).slice_count())
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for RemoteRecognizer {
    fn id(&self) -> ProviderId {
        ProviderId::Remote
    }

    fn is_supported(&self) -> bool {
        self.shared.client.is_some() && self.shared.capture_available
    }

    async fn start(&self, options: RecognitionOptions) -> Result<(), RecognitionError> {
        if !self.is_supported() {
            return Err(RecognitionError::Unsupported(if self.shared.client.is_none() {
                "remote transcription needs an API key".to_string()
            } else {
                "no audio capture device is available".to_string()
            }));
        }
        self.shared.start(options).await;
        Ok(())
    }

    fn stop(&self) {
        self.shared.stop();
    }

    fn is_listening(&self) -> bool {
        self.state() == RemoteState::Recording
    }

    fn name(&self) -> &str {
        "Remote transcription"
    }

    fn accuracy(&self) -> f32 {
        0.95
    }

    fn speed(&self) -> u32 {
        1500
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn start(self: &Arc<Self>, options: RecognitionOptions) {
        let _guard = self.start_lock.lock().await;

        let previous = self.lock().session.is_some();
        if previous {
            info!("Remote recognizer already recording, finalizing previous session");
            self.stop();
        }

        let (id, sink) = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            let sink = Sink::new(options.callbacks.clone());
            inner.session = Some(Session {
                id,
                language: options.language.clone(),
                sink: sink.clone(),
                recorder: Arc::new(Mutex::new(ClipRecorder::new(self.settings.clip.clone()))),
                capture: None,
                collector: None,
            });
            (id, sink)
        };

        // Waits for any previous session to release the hardware
        let mut capture = Arc::clone(&self.backend).lock_owned().await;
        info!("Requesting audio capture from {}", capture.name());

        let audio_rx = match capture.start().await {
            Ok(rx) => rx,
            Err(err) => {
                drop(capture);
                warn!("Audio capture could not start: {}", err);
                let detached = {
                    let mut inner = self.lock();
                    match inner.session.as_ref() {
                        Some(s) if s.id == id => {
                            inner.settle();
                            inner.session.take()
                        }
                        _ => None,
                    }
                };
                if detached.is_some() {
                    sink.outbox()
                        .with(Outgoing::Error(err.into()))
                        .with(Outgoing::End)
                        .deliver();
                }
                return;
            }
        };

        let attached = {
            let mut inner = self.lock();
            match inner.session.as_mut() {
                Some(session) if session.id == id => {
                    let recorder = Arc::clone(&session.recorder);
                    session.collector = Some(tokio::spawn(async move {
                        let mut audio_rx = audio_rx;
                        while let Some(frame) = audio_rx.recv().await {
                            lock_recorder(&recorder).push(&frame);
                        }
                    }));
                    session.capture = Some(capture);
                    inner.state = RemoteState::Recording;
                    None
                }
                _ => Some(capture),
            }
        };

        if let Some(mut capture) = attached {
            // Stopped while the hardware was being negotiated
            debug!("Session {} stopped during capture start, releasing", id);
            if let Err(e) = capture.stop().await {
                warn!("Failed to stop audio capture: {}", e);
            }
            return;
        }

        info!("Remote recording session {} started", id);
        sink.outbox().with(Outgoing::Start).deliver();
    }

    fn stop(self: &Arc<Self>) {
        let session = {
            let mut inner = self.lock();
            let Some(session) = inner.session.take() else {
                return;
            };
            if session.capture.is_some() {
                inner.uploads_in_flight += 1;
            }
            inner.settle();
            session
        };

        if session.capture.is_none() {
            // Capture never started: nothing to upload
            session.sink.outbox().with(Outgoing::End).deliver();
            return;
        }

        info!("Remote recording session {} stopping", session.id);
        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.finalize(session).await });
    }

    async fn finalize(self: Arc<Self>, session: Session) {
        let Session {
            id,
            language,
            sink,
            recorder,
            capture,
            collector,
        } = session;

        if let Some(mut capture) = capture {
            if let Err(e) = capture.stop().await {
                warn!("Audio capture failed to stop cleanly, releasing anyway: {}", e);
            }
            drop(capture);
        }

        if let Some(mut collector) = collector {
            if tokio::time::timeout(self.settings.drain_timeout, &mut collector)
                .await
                .is_err()
            {
                warn!("Capture channel did not close, dropping undelivered frames");
                collector.abort();
            }
        }

        let clip = lock_recorder(&recorder).finish();
        let outcome = match clip {
            None => Err(RecognitionError::EmptyRecording),
            Some(clip) => match clip.to_wav() {
                Ok(wav) => self.upload(wav, &language).await,
                Err(e) => Err(RecognitionError::Engine(format!("could not encode audio: {e:#}"))),
            },
        };

        let mut outbox = sink.outbox();
        match outcome {
            Ok(text) => {
                let text = self.normalizer.normalize(&text);
                debug!("Remote session {} transcript: {}", id, text);
                if !text.is_empty() {
                    // The transcription endpoint does not score its output
                    outbox.push(Outgoing::Result(TranscriptEvent::final_text(text, None)));
                }
            }
            Err(err) => {
                warn!("Remote session {} failed: {}", id, err);
                outbox.push(Outgoing::Error(err));
            }
        }
        outbox.push(Outgoing::End);

        {
            let mut inner = self.lock();
            inner.uploads_in_flight = inner.uploads_in_flight.saturating_sub(1);
            if inner.state != RemoteState::Recording {
                inner.settle();
            }
        }

        info!("Remote session {} finished", id);
        outbox.deliver();
    }

    async fn upload(&self, wav: Vec<u8>, language: &str) -> Result<String, RecognitionError> {
        match &self.client {
            Some(client) => client.transcribe(wav, language).await,
            None => Err(RecognitionError::Unsupported(
                "remote transcription needs an API key".to_string(),
            )),
        }
    }
}
