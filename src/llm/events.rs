//! Streaming text events.
//!
//! A [`TextStream`] is lazy, forward-only, and consumer-driven: nothing is
//! requested from the backend until it is polled, and dropping it cancels the
//! upstream request. Every stream ends with exactly one terminal event,
//! [`TextEvent::Done`] or [`TextEvent::Error`].

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use super::error::LlmError;

/// One item of a streaming text response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEvent {
    /// A chunk of generated text.
    Delta(String),
    /// Generation finished normally.
    Done,
    /// Generation failed part-way.
    Error(String),
}

impl TextEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// A boxed stream of text events.
pub type TextStream = Pin<Box<dyn Stream<Item = TextEvent> + Send>>;

/// Drain a stream into a single string.
///
/// # Errors
///
/// Returns [`LlmError::StreamError`] if the stream ends with an error event.
pub async fn collect_text(mut stream: TextStream) -> Result<String, LlmError> {
    let mut text = String::new();
    while let Some(event) = stream.next().await {
        match event {
            TextEvent::Delta(chunk) => text.push_str(&chunk),
            TextEvent::Done => break,
            TextEvent::Error(message) => return Err(LlmError::StreamError(message)),
        }
    }
    Ok(text)
}

/// A stream that yields `text` as one delta followed by `Done`.
pub fn single_shot(text: String) -> TextStream {
    Box::pin(futures_util::stream::iter([
        TextEvent::Delta(text),
        TextEvent::Done,
    ]))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[tokio::test]
    async fn collect_concatenates_deltas() {
        let stream: TextStream = Box::pin(futures_util::stream::iter([
            TextEvent::Delta("Hel".into()),
            TextEvent::Delta("lo".into()),
            TextEvent::Done,
        ]));
        assert_eq!(collect_text(stream).await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn collect_surfaces_error_event() {
        let stream: TextStream = Box::pin(futures_util::stream::iter([
            TextEvent::Delta("partial".into()),
            TextEvent::Error("connection reset".into()),
        ]));
        let err = collect_text(stream).await.unwrap_err();
        assert_eq!(err.message(), "connection reset");
    }

    #[tokio::test]
    async fn single_shot_ends_with_done() {
        let events: Vec<TextEvent> = single_shot("hi".into()).collect().await;
        assert_eq!(events, vec![TextEvent::Delta("hi".into()), TextEvent::Done]);
        assert!(events[1].is_terminal());
    }
}
