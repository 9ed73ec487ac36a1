use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use speech_entry::audio::{AudioBackend, AudioBackendConfig, FileBackend, NullBackend};
use speech_entry::local::{ScriptedEngine, SpeechEngine};
use speech_entry::{
    create_router, AppState, Config, ProviderPreference, RecognitionCallbacks, RecognitionManager,
    TextNormalizer,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "speech-entry", version, about = "Speech recognition for list entry")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/speech-entry")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the final-mode normalizer over TEXT
    Normalize { text: String },
    /// List providers and whether they can start
    Providers {
        #[command(flatten)]
        sources: Sources,
    },
    /// Run one session and print its events
    Listen {
        /// auto, local or remote (overrides configuration)
        #[arg(long)]
        provider: Option<String>,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,
        #[command(flatten)]
        sources: Sources,
    },
    /// Serve the HTTP control API
    Serve {
        #[command(flatten)]
        sources: Sources,
    },
}

#[derive(Args)]
struct Sources {
    /// JSON engine script for the local provider
    #[arg(long)]
    script: Option<PathBuf>,
    /// WAV file used as the capture device for the remote provider
    #[arg(long)]
    wav: Option<PathBuf>,
}

impl Sources {
    fn engine(&self) -> Result<Arc<dyn SpeechEngine>> {
        match &self.script {
            Some(path) => Ok(Arc::new(ScriptedEngine::from_file(path)?)),
            None => {
                warn!("No engine script given, local recognition is unavailable");
                Ok(Arc::new(ScriptedEngine::unavailable()))
            }
        }
    }

    fn backend(&self) -> Box<dyn AudioBackend> {
        match &self.wav {
            Some(path) => {
                Box::new(FileBackend::new(path, AudioBackendConfig::default()).realtime(true))
            }
            None => Box::new(NullBackend),
        }
    }

    fn manager(&self, cfg: &Config) -> Result<RecognitionManager> {
        Ok(RecognitionManager::from_config(cfg, self.engine()?, self.backend()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Normalize { text } => {
            let normalizer = TextNormalizer::with_extra(&cfg.normalizer.corrections);
            println!("{}", normalizer.normalize(&text));
        }
        Command::Providers { sources } => {
            let manager = sources.manager(&cfg)?;
            for provider in manager.get_available_providers() {
                println!(
                    "{:<8} {:<28} supported={:<5} accuracy={:.2} latency={}ms",
                    provider.id,
                    provider.name,
                    provider.supported,
                    provider.accuracy,
                    provider.latency_ms
                );
            }
        }
        Command::Listen {
            provider,
            seconds,
            sources,
        } => {
            let manager = sources.manager(&cfg)?;
            if let Some(provider) = provider {
                let preference: ProviderPreference = provider.parse()?;
                manager.set_preferred_provider(preference);
            }
            listen(&manager, &cfg, Duration::from_secs(seconds)).await?;
        }
        Command::Serve { sources } => {
            let manager = Arc::new(sources.manager(&cfg)?);
            let state = AppState::new(manager, cfg.recognition.clone());
            let app = create_router(state).layer(CorsLayer::permissive());

            let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            info!("HTTP API listening on {}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Shutting down");
                })
                .await
                .context("HTTP server failed")?;
        }
    }

    Ok(())
}

async fn listen(manager: &RecognitionManager, cfg: &Config, duration: Duration) -> Result<()> {
    let ended = Arc::new(Notify::new());
    let finals = Arc::new(Mutex::new(Vec::<String>::new()));

    let callbacks = RecognitionCallbacks::new()
        .on_start(|| println!("[start]"))
        .on_interim_result(|text| println!("[interim] {text}"))
        .on_result({
            let finals = Arc::clone(&finals);
            move |text: &str, is_final: bool| {
                if is_final {
                    println!("[final] {text}");
                    if let Ok(mut finals) = finals.lock() {
                        finals.push(text.to_string());
                    }
                } else {
                    println!("[interim] {text}");
                }
            }
        })
        .on_error(|err| println!("[error] {err}"))
        .on_end({
            let ended = Arc::clone(&ended);
            move || {
                println!("[end]");
                ended.notify_one();
            }
        });

    let options = cfg.recognition.options().with_callbacks(callbacks);
    let provider = manager
        .start(options)
        .await
        .context("Could not start recognition")?;
    info!("Listening with {} for {}s", provider, duration.as_secs());

    let ended_early = tokio::select! {
        _ = ended.notified() => true,
        _ = tokio::time::sleep(duration) => false,
        _ = tokio::signal::ctrl_c() => false,
    };

    if !ended_early {
        manager.stop();
        // Remote sessions upload after stop; wait for their end
        ended.notified().await;
    }

    print_transcript(manager.normalizer(), &finals);
    Ok(())
}

fn print_transcript(normalizer: &TextNormalizer, finals: &Mutex<Vec<String>>) {
    if let Ok(finals) = finals.lock() {
        if !finals.is_empty() {
            println!("Transcript: {}", normalizer.normalize(&finals.join(" ")));
        }
    }
}
