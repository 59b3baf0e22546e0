//! Error types for the text-generation backends.
//!
//! Each variant carries a stable SCREAMING_SNAKE_CASE code, included in the
//! Display output and available via [`LlmError::code()`].

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Invalid or missing backend configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Authentication failed (invalid/missing API key).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// The HTTP request could not be sent or was rate limited.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// A streaming response broke off or carried an error.
    pub const STREAM_FAILED: &str = "STREAM_FAILED";

    /// The provider answered with an error status.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";

    /// The provider answered successfully but the body was unusable.
    pub const RESPONSE_INVALID: &str = "RESPONSE_INVALID";
}

/// Errors produced by text-generation backends.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Invalid or missing backend configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    ConfigError(String),

    /// Authentication failed (invalid/missing API key).
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    AuthError(String),

    /// The HTTP request could not be sent or was rate limited.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    RequestError(String),

    /// A streaming response broke off or carried an error.
    #[error("[{}] {}", error_codes::STREAM_FAILED, .0)]
    StreamError(String),

    /// The provider answered with an error status.
    #[error("[{}] {}", error_codes::PROVIDER_ERROR, .0)]
    ProviderError(String),

    /// The provider answered successfully but the body was unusable.
    #[error("[{}] {}", error_codes::RESPONSE_INVALID, .0)]
    ResponseError(String),
}

impl LlmError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => error_codes::CONFIG_INVALID,
            Self::AuthError(_) => error_codes::AUTH_FAILED,
            Self::RequestError(_) => error_codes::REQUEST_FAILED,
            Self::StreamError(_) => error_codes::STREAM_FAILED,
            Self::ProviderError(_) => error_codes::PROVIDER_ERROR,
            Self::ResponseError(_) => error_codes::RESPONSE_INVALID,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ConfigError(m)
            | Self::AuthError(m)
            | Self::RequestError(m)
            | Self::StreamError(m)
            | Self::ProviderError(m)
            | Self::ResponseError(m) => m,
        }
    }
}
