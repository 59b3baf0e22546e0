//! Speech-to-text backends.
//!
//! Transcription is delegated to an external Whisper server; the hub only
//! forwards uploaded audio and returns the text.

mod whisper;

use std::path::Path;

use async_trait::async_trait;

pub use whisper::WhisperHttpBackend;

/// Model names and repository ids shipped by faster-whisper.
pub const FASTER_WHISPER_MODELS: &[(&str, &str)] = &[
    ("tiny", "Systran/faster-whisper-tiny"),
    ("tiny.en", "Systran/faster-whisper-tiny.en"),
    ("base", "Systran/faster-whisper-base"),
    ("base.en", "Systran/faster-whisper-base.en"),
    ("small", "Systran/faster-whisper-small"),
    ("small.en", "Systran/faster-whisper-small.en"),
    ("medium", "Systran/faster-whisper-medium"),
    ("medium.en", "Systran/faster-whisper-medium.en"),
    ("large-v1", "Systran/faster-whisper-large-v1"),
    ("large-v2", "Systran/faster-whisper-large-v2"),
    ("large-v3", "Systran/faster-whisper-large-v3"),
];

/// A speech recognition engine.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Transcribe an audio file.
    ///
    /// Returns an empty string when nothing was recognised or the engine
    /// failed; failures are logged by the implementation.
    async fn transcribe(&self, audio: &Path, model_repo: &str, language: Option<&str>) -> String;

    /// `(name, repo_id)` pairs this backend can load, in display order.
    fn advertised_models(&self) -> Vec<(String, String)> {
        FASTER_WHISPER_MODELS
            .iter()
            .map(|(name, repo)| ((*name).to_owned(), (*repo).to_owned()))
            .collect()
    }
}
