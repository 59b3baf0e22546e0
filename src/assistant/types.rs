//! Assistant pipeline data types.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::AssistantError;

/// Intent category chosen by pass 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    TextGeneration,
    BtControl,
    Other(String),
}

impl Category {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "text-generation" => Self::TextGeneration,
            "bt-control" => Self::BtControl,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::TextGeneration => "text-generation",
            Self::BtControl => "bt-control",
            Self::Other(other) => other,
        }
    }
}

/// Parsed pass 1 output.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass1Result {
    pub category: String,
    /// Usually a number in `0.0..=1.0`, kept as sent.
    pub confidence: Value,
    pub reasoning: String,
    pub user_data: String,
}

/// Tells the HTTP layer to stream a generation of `prompt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDirective {
    pub prompt: String,
    /// The model the client asked for, resolved through the catalog later.
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOutput {
    pub generated_output: String,
}

/// Structured device-control result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtControlResult {
    pub task: String,
    #[serde(rename = "user-data")]
    pub user_data: String,
    #[serde(rename = "processing-device")]
    pub processing_device: String,
    #[serde(rename = "source-device")]
    pub source_device: String,
    #[serde(rename = "target-device")]
    pub target_device: String,
    #[serde(rename = "parent-device")]
    pub parent_device: String,
    pub output: GeneratedOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Terminal state of one assistant request.
#[derive(Debug)]
pub enum AssistantOutcome {
    Stream(StreamDirective),
    Response(BtControlResult),
    Failure(AssistantError),
}

impl AssistantOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// JSON body for the outcome.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Stream(directive) => json!({
                "use_streaming": true,
                "user_query": directive.prompt,
                "lm_model": directive.model,
            }),
            Self::Response(result) => json!({
                "status": "success",
                "result": result,
            }),
            Self::Failure(err) => {
                let body = ErrorBody {
                    code: err.code().to_owned(),
                    message: err.message(),
                };
                json!({ "status": "error", "error": body })
            }
        }
    }
}
