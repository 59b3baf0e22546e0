//! Assistant pipeline errors.

/// Stable codes carried in `{"status":"error","error":{"code",...}}` bodies.
pub mod error_codes {
    /// Pass 1 output could not be parsed or lacked a required field.
    pub const CATEGORIZATION_FAILED: &str = "CATEGORIZATION_FAILED";

    /// A backend call failed during pass 1 or pass 2.
    pub const GENERATION_FAILED: &str = "GENERATION_FAILED";

    /// Pass 1 returned a category the pipeline cannot handle.
    pub const UNKNOWN_CATEGORY: &str = "UNKNOWN_CATEGORY";

    /// A prompt template could not be loaded or rendered.
    pub const TEMPLATE_INVALID: &str = "TEMPLATE_INVALID";

    /// Pass 2 named a device the registry does not know.
    pub const DEVICE_NOT_FOUND: &str = "DEVICE_NOT_FOUND";

    /// `/lm/query` without `user_query`.
    pub const MISSING_QUERY: &str = "MISSING_QUERY";

    /// `/lm/query` without `source_device_mac`.
    pub const MISSING_SOURCE_MAC: &str = "MISSING_SOURCE_MAC";

    /// Anything else.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Errors raised inside the two-pass pipeline.
///
/// These never leave [`Orchestrator::handle_request`](super::Orchestrator::handle_request);
/// they are converted to a structured error body there.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("[{}] {}", error_codes::CATEGORIZATION_FAILED, .0)]
    Categorization(String),

    #[error("[{}] {}", error_codes::GENERATION_FAILED, .0)]
    Generation(String),

    #[error("[{}] Unknown category: {}", error_codes::UNKNOWN_CATEGORY, .0)]
    UnknownCategory(String),

    #[error("[{}] {}", error_codes::TEMPLATE_INVALID, .0)]
    Template(String),

    #[error("[{}] {}", error_codes::INTERNAL_ERROR, .0)]
    Internal(String),
}

impl AssistantError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Categorization(_) => error_codes::CATEGORIZATION_FAILED,
            Self::Generation(_) => error_codes::GENERATION_FAILED,
            Self::UnknownCategory(_) => error_codes::UNKNOWN_CATEGORY,
            Self::Template(_) => error_codes::TEMPLATE_INVALID,
            Self::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Self::UnknownCategory(category) => format!("Unknown category: {category}"),
            Self::Categorization(m) | Self::Generation(m) | Self::Template(m) | Self::Internal(m) => {
                m.clone()
            }
        }
    }
}

impl From<crate::llm::LlmError> for AssistantError {
    fn from(err: crate::llm::LlmError) -> Self {
        Self::Generation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
