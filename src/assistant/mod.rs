//! Two-pass assistant pipeline.
//!
//! Pass 1 asks the text backend to classify a spoken request. Text requests
//! are handed back as a [`StreamDirective`] for the HTTP layer to stream;
//! device commands go through pass 2, which produces a command and a target
//! device name that is resolved against the registry.

pub mod error;
pub mod orchestrator;
pub mod parse;
pub mod templates;
pub mod types;

pub use error::{AssistantError, error_codes};
pub use orchestrator::{Orchestrator, describe_device, find_device_by_name, format_device_list};
pub use templates::PromptTemplates;
pub use types::{AssistantOutcome, BtControlResult, Category, Pass1Result, StreamDirective};
