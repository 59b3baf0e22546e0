//! Text-generation backend trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::LlmError;
use super::events::{TextStream, single_shot};

/// A model advertised by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListing {
    /// Short name shown to clients (e.g. `gemini-2.5-flash`).
    pub display_name: String,
    /// Identifier passed back to the backend (e.g. `models/gemini-2.5-flash`).
    pub id: String,
}

impl ModelListing {
    pub fn new(display_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            id: id.into(),
        }
    }
}

/// A generative-text engine.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Backend name for logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Generate a complete response.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError>;

    /// Stream a response incrementally.
    ///
    /// Defaults to a single chunk produced by [`generate`](Self::generate).
    async fn stream(&self, model: &str, prompt: &str) -> Result<TextStream, LlmError> {
        let text = self.generate(model, prompt).await?;
        Ok(single_shot(text))
    }

    /// Models this backend can serve.
    async fn list_models(&self) -> Result<Vec<ModelListing>, LlmError>;
}
