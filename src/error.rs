//! Error types for the echohub server.

/// Top-level error type for startup, configuration, and server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// HTTP server bind or serve error.
    #[error("server error: {0}")]
    Server(String),

    /// Model catalog error.
    #[error("catalog error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    /// Language model backend error.
    #[error("LLM error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    /// Speech-to-text error.
    #[error("STT error: {0}")]
    Stt(String),

    /// Prompt template or assistant pipeline error.
    #[error("assistant error: {0}")]
    Assistant(#[from] crate::assistant::AssistantError),

    /// Device registry error.
    #[error("registry error: {0}")]
    Registry(#[from] echohub_devices::RegistryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HubError>;
