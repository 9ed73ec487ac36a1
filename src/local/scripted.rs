use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::engine::{EngineConfig, EngineErrorCode, EngineEvent, SpeechEngine};

/// One scripted engine event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Wait before emitting the event
    #[serde(default)]
    pub delay_ms: u64,
    pub event: EngineEvent,
}

/// Engine behaviour, one run per engine start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineScript {
    pub runs: Vec<Vec<ScriptStep>>,
}

impl EngineScript {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine script: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse engine script: {}", path.display()))
    }
}

struct ScriptState {
    next_run: usize,
    task: Option<JoinHandle<()>>,
}

/// Speech engine that replays a script instead of listening to a microphone
///
/// Each start consumes the next run; the engine ends on its own after the
/// run's last step. Once all runs are used up it keeps "listening" silently
/// until stopped.
pub struct ScriptedEngine {
    script: EngineScript,
    available: bool,
    state: Mutex<ScriptState>,
}

impl ScriptedEngine {
    pub fn new(script: EngineScript) -> Self {
        info!("Scripted engine loaded ({} runs)", script.runs.len());

        Self {
            script,
            available: true,
            state: Mutex::new(ScriptState {
                next_run: 0,
                task: None,
            }),
        }
    }

    /// An engine that reports itself unavailable, for hosts without one
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(EngineScript::default())
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(EngineScript::load(path)?))
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn halt(&self) {
        if let Some(task) = self.lock().task.take() {
            task.abort();
        }
    }
}

#[async_trait::async_trait]
impl SpeechEngine for ScriptedEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn start(
        &self,
        config: &EngineConfig,
    ) -> Result<mpsc::Receiver<EngineEvent>, EngineErrorCode> {
        if !self.available {
            return Err(EngineErrorCode::ServiceNotAllowed);
        }

        let mut state = self.lock();
        if state.task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(EngineErrorCode::Other("engine-busy".to_string()));
        }

        let run = self.script.runs.get(state.next_run).cloned();
        state.next_run += 1;
        debug!(
            "Scripted engine run {} started (language {})",
            state.next_run, config.language
        );

        let (tx, rx) = mpsc::channel(32);
        state.task = Some(tokio::spawn(async move {
            let Some(steps) = run else {
                // Script exhausted: stay silent until the receiver goes away
                tx.closed().await;
                return;
            };

            for step in steps {
                tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
                let is_end = step.event == EngineEvent::End;
                if tx.send(step.event).await.is_err() || is_end {
                    return;
                }
            }

            let _ = tx.send(EngineEvent::End).await;
        }));

        Ok(rx)
    }

    fn stop(&self) {
        self.halt();
    }

    fn abort(&self) {
        self.halt();
    }

    fn name(&self) -> &str {
        "Scripted speech engine"
    }
}
