use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::recognition::RecognitionError;

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint
#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl TranscriptionClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            model: model.trim().to_string(),
        }
    }

    /// `None` when no credential is configured
    pub fn from_config(config: &RemoteConfig) -> Option<Self> {
        config
            .credential()
            .map(|key| Self::new(&config.base_url, key, &config.model))
    }

    pub fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    /// Upload one WAV clip and return the raw transcript text
    pub async fn transcribe(&self, wav: Vec<u8>, language: &str) -> Result<String, RecognitionError> {
        let url = self.endpoint();
        debug!(
            "Sending transcription request to {} ({} bytes, model {})",
            url,
            wav.len(),
            self.model
        );

        let file_part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| RecognitionError::Engine(format!("invalid audio part: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        if let Some(language) = language_hint(language) {
            form = form.text("language", language);
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                RecognitionError::Network(format!("could not reach the transcription service: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or_else(|| {
                format!("the transcription service returned an error (HTTP {})", status.as_u16())
            });
            return Err(RecognitionError::Remote {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: TranscriptionResponse = response.json().await.map_err(|e| {
            RecognitionError::Remote {
                status: Some(status.as_u16()),
                message: format!("unreadable response from the transcription service: {e}"),
            }
        })?;

        debug!("Transcription completed ({} chars)", body.text.len());
        Ok(body.text)
    }
}

/// Reduce a BCP-47 tag to the primary subtag the service expects
///
/// `None` means "let the service detect the language".
pub fn language_hint(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() || tag.eq_ignore_ascii_case("auto") {
        return None;
    }

    tag.split(['-', '_'])
        .next()
        .filter(|primary| !primary.is_empty())
        .map(str::to_lowercase)
}

/// Best-effort extraction of a readable message from an error body
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    let candidates = [
        value.pointer("/error/message"),
        value.get("error"),
        value.get("message"),
        value.get("detail"),
    ];

    let message = candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string);
    message
}
