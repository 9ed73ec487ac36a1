use anyhow::{Context, Result};
use serde::Deserialize;

use crate::manager::ProviderPreference;
use crate::normalize::CorrectionEntry;
use crate::recognition::{RecognitionCallbacks, RecognitionOptions};

/// Environment prefix, e.g. `SPEECH_ENTRY__REMOTE__API_KEY`
pub const ENV_PREFIX: &str = "SPEECH_ENTRY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recognition: RecognitionConfig,
    pub local: LocalConfig,
    pub remote: RemoteConfig,
    pub normalizer: NormalizerConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub provider: ProviderPreference,
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
    pub auto_restart: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderPreference::Auto,
            language: "vi-VN".to_string(),
            continuous: true,
            interim_results: true,
            max_alternatives: 3,
            auto_restart: true,
        }
    }
}

impl RecognitionConfig {
    /// Session options from these defaults, without callbacks
    pub fn options(&self) -> RecognitionOptions {
        RecognitionOptions {
            language: self.language.clone(),
            continuous: self.continuous,
            interim_results: self.interim_results,
            max_alternatives: self.max_alternatives,
            auto_restart: self.auto_restart,
            callbacks: RecognitionCallbacks::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub restart_delay_ms: u64,
    pub start_grace_ms: u64,
    pub max_silent_restarts: u32,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: 300,
            start_grace_ms: 250,
            max_silent_restarts: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Without a key the remote provider reports itself unsupported
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub slice_ms: u64,
    pub drain_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "whisper-1".to_string(),
            slice_ms: 250,
            drain_timeout_ms: 500,
        }
    }
}

impl RemoteConfig {
    /// The API key, if one is set and not blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Appended after the built-in table
    pub corrections: Vec<CorrectionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

impl Config {
    /// Load `path` (any format `config` understands, extension optional and
    /// the file itself optional) with environment overrides on top
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load configuration from {path}"))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
