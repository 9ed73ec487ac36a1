use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::selection::ProviderPreference;
use crate::audio::AudioBackend;
use crate::config::Config;
use crate::local::{LocalRecognizer, SpeechEngine};
use crate::normalize::TextNormalizer;
use crate::recognition::{
    InterimCallback, ProviderDescriptor, ProviderId, RecognitionCallbacks, RecognitionError,
    RecognitionOptions, ResultCallback, SpeechRecognizer, TranscriptCallback, TranscriptEvent,
};
use crate::remote::{RemoteRecognizer, TranscriptionClient};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Selects a provider per session and relays normalized results
///
/// Changing the preference only affects the next `start`. Results of a
/// session that has been superseded by a newer `start` are dropped.
pub struct RecognitionManager {
    providers: BTreeMap<ProviderId, Arc<dyn SpeechRecognizer>>,
    normalizer: Arc<TextNormalizer>,
    preference: Mutex<ProviderPreference>,
    current: Mutex<Option<Arc<dyn SpeechRecognizer>>>,
    /// Bumped on every start; wrapped callbacks compare against it
    epoch: Arc<AtomicU64>,
}

impl RecognitionManager {
    pub fn new(
        preference: ProviderPreference,
        providers: Vec<Arc<dyn SpeechRecognizer>>,
        normalizer: Arc<TextNormalizer>,
    ) -> Self {
        let providers: BTreeMap<_, _> = providers.into_iter().map(|p| (p.id(), p)).collect();

        info!(
            "Recognition manager ready: preference={}, providers=[{}]",
            preference,
            providers
                .values()
                .map(|p| {
                    let status = if p.is_supported() { "supported" } else { "unsupported" };
                    format!("{} ({})", p.id(), status)
                })
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self {
            providers,
            normalizer,
            preference: Mutex::new(preference),
            current: Mutex::new(None),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Build both providers from configuration
    pub fn from_config(
        config: &Config,
        engine: Arc<dyn SpeechEngine>,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        let normalizer = Arc::new(TextNormalizer::with_extra(&config.normalizer.corrections));

        let local = LocalRecognizer::new(engine, (&config.local).into());
        let remote = RemoteRecognizer::new(
            backend,
            TranscriptionClient::from_config(&config.remote),
            Arc::clone(&normalizer),
            (&config.remote).into(),
        );

        Self::new(
            config.recognition.provider,
            vec![Arc::new(local), Arc::new(remote)],
            normalizer,
        )
    }

    /// The normalizer applied to every provider's output
    pub fn normalizer(&self) -> &Arc<TextNormalizer> {
        &self.normalizer
    }

    /// Start a session on the resolved provider
    ///
    /// Fails before doing anything when no provider can serve the session.
    /// Any live session is stopped first; the local adapter then waits out
    /// its start grace before acquiring the engine again.
    pub async fn start(&self, options: RecognitionOptions) -> Result<ProviderId, RecognitionError> {
        let provider = self.resolve()?;

        let previous = lock(&self.current).take();
        if let Some(previous) = previous {
            debug!("Stopping previous session on {}", previous.id());
            previous.stop();
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let callbacks = self.wrap(options.callbacks.clone(), epoch);
        *lock(&self.current) = Some(Arc::clone(&provider));

        info!(
            "Starting recognition with {} (language {})",
            provider.name(),
            options.language
        );

        if let Err(err) = provider.start(options.with_callbacks(callbacks)).await {
            warn!("Provider {} refused to start: {}", provider.id(), err);
            let mut current = lock(&self.current);
            if self.epoch.load(Ordering::SeqCst) == epoch {
                *current = None;
            }
            return Err(err);
        }

        Ok(provider.id())
    }

    /// Stop the current session, if any
    pub fn stop(&self) {
        let current = lock(&self.current).clone();
        match current {
            Some(provider) => provider.stop(),
            None => debug!("Stop requested with no active provider"),
        }
    }

    pub fn is_listening(&self) -> bool {
        let current = lock(&self.current).clone();
        current.is_some_and(|provider| provider.is_listening())
    }

    /// Descriptors of every registered provider, local first
    pub fn get_available_providers(&self) -> Vec<ProviderDescriptor> {
        self.providers.values().map(|p| p.descriptor()).collect()
    }

    /// Takes effect on the next `start`
    pub fn set_preferred_provider(&self, preference: ProviderPreference) {
        info!("Preferred provider set to {}", preference);
        *lock(&self.preference) = preference;
    }

    pub fn preferred_provider(&self) -> ProviderPreference {
        *lock(&self.preference)
    }

    /// Provider serving (or last serving) a session
    pub fn current_provider(&self) -> Option<ProviderId> {
        lock(&self.current).as_ref().map(|p| p.id())
    }

    fn supported(&self, id: ProviderId) -> Option<Arc<dyn SpeechRecognizer>> {
        self.providers
            .get(&id)
            .filter(|p| p.is_supported())
            .cloned()
    }

    fn resolve(&self) -> Result<Arc<dyn SpeechRecognizer>, RecognitionError> {
        let preference = self.preferred_provider();

        let resolved = match preference {
            ProviderPreference::Auto | ProviderPreference::Local => self.supported(ProviderId::Local),
            ProviderPreference::Remote => self.supported(ProviderId::Remote).or_else(|| {
                warn!("Remote provider is not available, falling back to local");
                self.supported(ProviderId::Local)
            }),
        };

        resolved.ok_or_else(|| {
            RecognitionError::Unsupported(format!(
                "no recognition provider is available (preference: {preference})"
            ))
        })
    }

    /// Normalize transcript callbacks; everything else passes through
    fn wrap(&self, callbacks: RecognitionCallbacks, epoch: u64) -> RecognitionCallbacks {
        let RecognitionCallbacks {
            on_start,
            on_interim_result,
            on_result,
            on_transcript,
            on_error,
            on_end,
        } = callbacks;

        let on_result = on_result.map(|cb| {
            let normalizer = Arc::clone(&self.normalizer);
            let current = Arc::clone(&self.epoch);
            Arc::new(move |text: &str, is_final: bool| {
                if current.load(Ordering::SeqCst) != epoch {
                    debug!("Dropping result from a superseded session");
                    return;
                }
                let text = if is_final {
                    normalizer.normalize(text)
                } else {
                    normalizer.normalize_interim(text)
                };
                cb(&text, is_final);
            }) as ResultCallback
        });

        let on_transcript = on_transcript.map(|cb| {
            let normalizer = Arc::clone(&self.normalizer);
            let current = Arc::clone(&self.epoch);
            Arc::new(move |event: &TranscriptEvent| {
                if current.load(Ordering::SeqCst) != epoch {
                    return;
                }
                let text = if event.is_final {
                    normalizer.normalize(&event.text)
                } else {
                    normalizer.normalize_interim(&event.text)
                };
                cb(&TranscriptEvent {
                    text,
                    is_final: event.is_final,
                    confidence: event.confidence,
                });
            }) as TranscriptCallback
        });

        let on_interim_result = on_interim_result.map(|cb| {
            let normalizer = Arc::clone(&self.normalizer);
            let current = Arc::clone(&self.epoch);
            Arc::new(move |text: &str| {
                if current.load(Ordering::SeqCst) != epoch {
                    return;
                }
                cb(&normalizer.normalize_interim(text));
            }) as InterimCallback
        });

        RecognitionCallbacks {
            on_start,
            on_interim_result,
            on_result,
            on_transcript,
            on_error,
            on_end,
        }
    }
}
