use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::engine::{EngineConfig, EngineErrorCode, EngineEvent, EngineSegment, ErrorClass, SpeechEngine};
use crate::config::LocalConfig;
use crate::recognition::{
    best_alternative, Outgoing, ProviderId, RecognitionError, RecognitionOptions, Sink,
    SpeechRecognizer, TranscriptAccumulator, TranscriptEvent,
};

/// Timing and retry settings for the local adapter
#[derive(Debug, Clone)]
pub struct LocalSettings {
    /// Delay between a spontaneous engine end and the restart
    pub restart_delay: Duration,
    /// Pause between stopping a previous session and starting a new one
    pub start_grace: Duration,
    /// Consecutive recoveries (without any transcript) before giving up
    pub max_silent_restarts: u32,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            restart_delay: Duration::from_millis(300),
            start_grace: Duration::from_millis(250),
            max_silent_restarts: 5,
        }
    }
}

impl From<&LocalConfig> for LocalSettings {
    fn from(config: &LocalConfig) -> Self {
        Self {
            restart_delay: Duration::from_millis(config.restart_delay_ms),
            start_grace: Duration::from_millis(config.start_grace_ms),
            max_silent_restarts: config.max_silent_restarts,
        }
    }
}

/// Listening state of the local adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    Idle,
    Listening,
    RestartPending,
    Stopped,
}

struct Session {
    id: u64,
    /// Incremented on every engine (re)start; stale engine events are ignored
    run: u64,
    options: RecognitionOptions,
    sink: Sink,
    transcript: TranscriptAccumulator,
    manual_stop: bool,
    engine_running: bool,
    /// Consecutive recoveries since the last transcript result
    recoveries: u32,
    restart_timer: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
}

struct Inner {
    state: ListenState,
    session: Option<Session>,
    next_id: u64,
    /// When the engine handle was last stopped or aborted
    last_release: Option<Instant>,
}

impl Inner {
    fn live(&mut self, id: u64, run: u64) -> Option<&mut Session> {
        self.session
            .as_mut()
            .filter(|s| s.id == id && s.run == run && !s.manual_stop)
    }

    fn detach(&mut self, state: ListenState) -> Option<Session> {
        self.state = state;
        let mut session = self.session.take()?;
        if let Some(timer) = session.restart_timer.take() {
            timer.abort();
        }
        if let Some(pump) = session.pump.take() {
            pump.abort();
        }
        Some(session)
    }

    /// Detach, noting the release time when the engine still holds the device
    fn release(&mut self, state: ListenState, engine_running: bool) -> Option<Session> {
        if engine_running {
            self.last_release = Some(Instant::now());
        }
        self.detach(state)
    }
}

struct Shared {
    engine: Arc<dyn SpeechEngine>,
    settings: LocalSettings,
    inner: Mutex<Inner>,
    /// Serializes engine acquisition between `start` and scheduled restarts
    start_lock: tokio::sync::Mutex<()>,
}

/// Adapter over a continuous, interim-capable local engine
///
/// States: `Idle → Listening → (RestartPending → Listening)* → Stopped`.
/// Spontaneous engine ends in continuous auto-restart mode are bridged by a
/// restart after `restart_delay`; the restart re-checks the manual-stop flag
/// when it runs, not only when it was scheduled.
pub struct LocalRecognizer {
    shared: Arc<Shared>,
}

impl LocalRecognizer {
    pub fn new(engine: Arc<dyn SpeechEngine>, settings: LocalSettings) -> Self {
        info!(
            "Local recognizer initialized: {} (restart delay {}ms, max silent restarts {})",
            engine.name(),
            settings.restart_delay.as_millis(),
            settings.max_silent_restarts
        );

        Self {
            shared: Arc::new(Shared {
                engine,
                settings,
                inner: Mutex::new(Inner {
                    state: ListenState::Idle,
                    session: None,
                    next_id: 0,
                    last_release: None,
                }),
                start_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> ListenState {
        self.shared.lock().state
    }

    /// Accumulated final transcript of the live session
    pub fn transcript(&self) -> Option<String> {
        self.shared
            .lock()
            .session
            .as_ref()
            .map(|s| s.transcript.text().to_string())
    }

    pub fn settings(&self) -> &LocalSettings {
        &self.shared.settings
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for LocalRecognizer {
    fn id(&self) -> ProviderId {
        ProviderId::Local
    }

    fn is_supported(&self) -> bool {
        self.shared.engine.is_available()
    }

    async fn start(&self, options: RecognitionOptions) -> Result<(), RecognitionError> {
        self.shared.start(options).await
    }

    fn stop(&self) {
        self.shared.stop();
    }

    fn is_listening(&self) -> bool {
        matches!(
            self.state(),
            ListenState::Listening | ListenState::RestartPending
        )
    }

    fn name(&self) -> &str {
        self.shared.engine.name()
    }

    fn accuracy(&self) -> f32 {
        0.85
    }

    fn speed(&self) -> u32 {
        300
    }
}

impl Drop for LocalRecognizer {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn start(self: &Arc<Self>, options: RecognitionOptions) -> Result<(), RecognitionError> {
        if !self.engine.is_available() {
            return Err(RecognitionError::Unsupported(format!(
                "{} is not available on this system",
                self.engine.name()
            )));
        }

        let _guard = self.start_lock.lock().await;

        let previous = self.lock().session.is_some();
        if previous {
            info!("Local recognizer already active, stopping previous session");
            self.stop();
        }
        self.wait_for_release().await;

        let config = EngineConfig::from(&options);
        let id = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            let sink = Sink::new(options.callbacks.clone());
            inner.session = Some(Session {
                id,
                run: 0,
                options,
                sink,
                transcript: TranscriptAccumulator::new(),
                manual_stop: false,
                engine_running: false,
                recoveries: 0,
                restart_timer: None,
                pump: None,
            });
            inner.state = ListenState::Idle;
            id
        };

        info!(
            "Starting local recognition session {} ({}, language {})",
            id,
            self.engine.name(),
            config.language
        );

        match self.engine.start(&config).await {
            Ok(rx) => self.begin_run(id, 0, rx, true),
            Err(code) => {
                warn!("Local engine failed to start: {}", code);
                let session = {
                    let mut inner = self.lock();
                    if inner.live(id, 0).is_none() {
                        return Ok(());
                    }
                    inner.detach(ListenState::Stopped)
                };
                if let Some(session) = session {
                    session
                        .sink
                        .outbox()
                        .with(Outgoing::Error(code.to_error()))
                        .with(Outgoing::End)
                        .deliver();
                }
            }
        }

        Ok(())
    }

    /// Sleep out what remains of `start_grace` since the last release
    ///
    /// Covers callers that stopped the previous session themselves before
    /// starting a new one.
    async fn wait_for_release(&self) {
        let last_release = self.lock().last_release;
        let Some(released) = last_release else {
            return;
        };
        let remaining = self.settings.start_grace.saturating_sub(released.elapsed());
        if !remaining.is_zero() {
            debug!("Waiting {}ms for the engine to release", remaining.as_millis());
            tokio::time::sleep(remaining).await;
        }
    }

    /// Attach a freshly started engine run to the session
    fn begin_run(self: &Arc<Self>, id: u64, run: u64, rx: mpsc::Receiver<EngineEvent>, announce: bool) {
        let sink = {
            let mut inner = self.lock();
            let sink = inner.live(id, run).map(|session| {
                session.engine_running = true;
                session.sink.clone()
            });
            let Some(sink) = sink else {
                inner.last_release = Some(Instant::now());
                drop(inner);
                debug!("Session {} stopped while the engine was starting", id);
                self.engine.stop();
                return;
            };
            inner.state = ListenState::Listening;
            sink
        };

        // on_start goes out before the pump can deliver any transcript
        if announce {
            sink.outbox().with(Outgoing::Start).deliver();
        }

        let mut inner = self.lock();
        if let Some(session) = inner.live(id, run) {
            let shared = Arc::clone(self);
            session.pump = Some(tokio::spawn(shared.pump(id, run, rx)));
        }
    }

    async fn pump(self: Arc<Self>, id: u64, run: u64, mut rx: mpsc::Receiver<EngineEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                EngineEvent::Results { segments } => self.handle_results(id, run, segments),
                EngineEvent::Error { code } => self.handle_error(id, run, code),
                EngineEvent::End => break,
            }
        }

        self.handle_end(id, run);
    }

    fn handle_results(&self, id: u64, run: u64, segments: Vec<EngineSegment>) {
        let outbox = {
            let mut inner = self.lock();
            let Some(session) = inner.live(id, run) else {
                return;
            };
            session.recoveries = 0;

            let mut outbox = session.sink.outbox();
            let mut interim = Vec::new();
            for segment in &segments {
                let Some(best) = best_alternative(&segment.alternatives) else {
                    continue;
                };

                if segment.is_final {
                    if let Some(text) = session.transcript.push(&best.transcript) {
                        debug!(
                            "Final segment (session {}, confidence {:.2}): {}",
                            id, best.confidence, text
                        );
                        outbox.push(Outgoing::Result(TranscriptEvent::final_text(
                            text,
                            Some(best.confidence),
                        )));
                    }
                } else if !best.transcript.trim().is_empty() {
                    interim.push(best.transcript.trim());
                }
            }

            if !interim.is_empty() && session.options.interim_results {
                outbox.push(Outgoing::Interim(
                    session.transcript.preview(&interim.join(" ")),
                ));
            }
            outbox
        };

        outbox.deliver();
    }

    fn handle_error(&self, id: u64, run: u64, code: EngineErrorCode) {
        let max = self.settings.max_silent_restarts;
        let (outbox, release) = {
            let mut inner = self.lock();
            let Some(session) = inner.live(id, run) else {
                return;
            };
            let mut outbox = session.sink.outbox();

            match code.class() {
                ErrorClass::Silent => {
                    debug!("Engine reported '{}', ignoring", code);
                    return;
                }
                ErrorClass::Recoverable => {
                    session.recoveries += 1;
                    if session.recoveries <= max {
                        debug!(
                            "Recoverable engine error '{}' ({}/{}), restart follows",
                            code, session.recoveries, max
                        );
                        return;
                    }
                    warn!(
                        "Giving up after {} consecutive recoveries (last: '{}')",
                        max, code
                    );
                    outbox.push(Outgoing::Error(code.to_error()));
                    outbox.push(Outgoing::End);
                    let running = session.engine_running;
                    inner.release(ListenState::Stopped, running);
                    (outbox, running)
                }
                ErrorClass::Fatal => {
                    warn!("Fatal engine error '{}', stopping session {}", code, id);
                    outbox.push(Outgoing::Error(code.to_error()));
                    outbox.push(Outgoing::End);
                    let running = session.engine_running;
                    inner.release(ListenState::Stopped, running);
                    (outbox, running)
                }
                ErrorClass::Unrecognized => {
                    session.recoveries += 1;
                    warn!("Unrecognized engine error '{}', restart follows", code);
                    outbox.push(Outgoing::Error(code.to_error()));
                    if session.recoveries > max {
                        outbox.push(Outgoing::End);
                        let running = session.engine_running;
                        inner.release(ListenState::Stopped, running);
                        (outbox, running)
                    } else {
                        (outbox, false)
                    }
                }
            }
        };

        if release {
            self.engine.abort();
        }
        outbox.deliver();
    }

    fn handle_end(self: &Arc<Self>, id: u64, run: u64) {
        let session = {
            let mut inner = self.lock();
            let Some(session) = inner.live(id, run) else {
                return;
            };
            session.engine_running = false;

            if session.options.continuous && session.options.auto_restart {
                debug!("Engine ended spontaneously, restarting session {}", id);
                session.restart_timer = Some(self.schedule_restart(id));
                inner.state = ListenState::RestartPending;
                return;
            }

            inner.detach(ListenState::Stopped)
        };

        if let Some(session) = session {
            info!("Local recognition session {} ended", id);
            session.sink.outbox().with(Outgoing::End).deliver();
        }
    }

    fn schedule_restart(self: &Arc<Self>, id: u64) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let delay = self.settings.restart_delay;

        // Only the timer is cancellable; a restart that already began runs
        // to completion and re-checks the session itself.
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(shared.restart(id));
        })
    }

    async fn restart(self: Arc<Self>, id: u64) {
        let _guard = self.start_lock.lock().await;

        let (config, run) = {
            let mut inner = self.lock();
            let Some(session) = inner
                .session
                .as_mut()
                .filter(|s| s.id == id && !s.manual_stop)
            else {
                debug!("Restart skipped, session {} is no longer active", id);
                return;
            };
            if session.engine_running {
                // A concurrent restart already brought the engine back
                return;
            }
            session.restart_timer = None;
            session.run += 1;
            (EngineConfig::from(&session.options), session.run)
        };

        match self.engine.start(&config).await {
            Ok(rx) => {
                debug!("Engine restarted (session {}, run {})", id, run);
                self.begin_run(id, run, rx, false);
            }
            Err(code) => {
                warn!("Restart attempt failed for session {}: {}", id, code);
                self.handle_restart_failure(id, run, code);
            }
        }
    }

    fn handle_restart_failure(self: &Arc<Self>, id: u64, run: u64, code: EngineErrorCode) {
        let max = self.settings.max_silent_restarts;
        let session = {
            let mut inner = self.lock();
            let Some(session) = inner.live(id, run) else {
                return;
            };
            session.recoveries += 1;
            if session.recoveries <= max {
                session.restart_timer = Some(self.schedule_restart(id));
                return;
            }
            warn!("Giving up on session {} after {} failed restarts", id, max);
            inner.detach(ListenState::Stopped)
        };

        if let Some(session) = session {
            session
                .sink
                .outbox()
                .with(Outgoing::Error(code.to_error()))
                .with(Outgoing::End)
                .deliver();
        }
    }

    fn stop(&self) {
        let (outbox, engine_running) = {
            let mut inner = self.lock();
            let Some(session) = inner.session.as_mut() else {
                return;
            };
            if session.manual_stop {
                return;
            }

            // Flag first: a restart firing during teardown must observe it
            session.manual_stop = true;
            if let Some(timer) = session.restart_timer.take() {
                timer.abort();
            }
            session.transcript.clear();

            let running = session.engine_running;
            let outbox = session.sink.outbox().with(Outgoing::End);
            let id = session.id;
            inner.release(ListenState::Stopped, running);
            info!("Local recognition session {} stopped", id);
            (outbox, running)
        };

        if engine_running {
            self.engine.stop();
        }
        outbox.deliver();
    }
}
