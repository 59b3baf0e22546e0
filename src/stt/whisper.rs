//! OpenAI-compatible Whisper HTTP client.
//!
//! Works against faster-whisper servers exposing
//! `POST /v1/audio/transcriptions` (speaches, faster-whisper-server).

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};

use super::SpeechBackend;
use crate::config::SttConfig;
use crate::error::{HubError, Result};

/// Speech backend that uploads audio to a Whisper server.
pub struct WhisperHttpBackend {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for WhisperHttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperHttpBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl WhisperHttpBackend {
    pub fn new(config: &SttConfig) -> Self {
        let api_key = Some(config.api_key.trim().to_owned()).filter(|k| !k.is_empty());
        Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn try_transcribe(
        &self,
        audio: &Path,
        model_repo: &str,
        language: Option<&str>,
    ) -> Result<String> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_owned();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| HubError::Stt(format!("invalid mime type: {e}")))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", model_repo.to_owned())
            .text("response_format", "json");
        if let Some(lang) = language.filter(|l| !l.trim().is_empty()) {
            form = form.text("language", lang.trim().to_owned());
        }

        let mut request = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HubError::Stt(format!("transcription request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::Stt(format!("Whisper HTTP {}: {body}", status.as_u16())));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| HubError::Stt(format!("invalid transcription response: {e}")))?;
        Ok(body
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_owned())
    }
}

#[async_trait]
impl SpeechBackend for WhisperHttpBackend {
    fn name(&self) -> &str {
        "whisper-http"
    }

    async fn transcribe(&self, audio: &Path, model_repo: &str, language: Option<&str>) -> String {
        debug!(model = model_repo, ?language, "transcribing {}", audio.display());
        match self.try_transcribe(audio, model_repo, language).await {
            Ok(text) => text,
            Err(e) => {
                warn!("transcription failed: {e}");
                String::new()
            }
        }
    }
}
