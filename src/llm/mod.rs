//! Text-generation backends.
//!
//! [`TextBackend`] is the seam the assistant and HTTP layers depend on;
//! [`GeminiAdapter`] is the production implementation. Responses stream as
//! [`TextEvent`]s decoded from Server-Sent Events.

pub mod backend;
pub mod error;
pub mod events;
pub mod gemini;
pub mod sse;

pub use backend::{ModelListing, TextBackend};
pub use error::LlmError;
pub use events::{TextEvent, TextStream, collect_text};
pub use gemini::GeminiAdapter;
