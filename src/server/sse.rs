//! Server-Sent Event responses over [`TextStream`]s.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use tracing::warn;

use crate::assistant::error_codes;
use crate::llm::{TextEvent, TextStream};

/// Raw text chunks as `data:` lines, then `data: [DONE]`.
///
/// Errors are sent as an `error` event and end the stream.
pub fn text_events(
    mut stream: TextStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let events = async_stream::stream! {
        while let Some(event) = stream.next().await {
            match event {
                TextEvent::Delta(text) => yield Ok(Event::default().data(text)),
                TextEvent::Done => {
                    yield Ok(Event::default().data("[DONE]"));
                    break;
                }
                TextEvent::Error(message) => {
                    warn!("generation stream failed: {message}");
                    yield Ok(Event::default().event("error").data(message));
                    break;
                }
            }
        }
    };
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Assistant stream: a `status` event, `data` events carrying
/// `{"chunk": ...}`, and a terminal `done` or `error` event.
pub fn assistant_events(
    mut stream: TextStream,
    model: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let events = async_stream::stream! {
        let status = json!({ "status": "streaming", "category": "text-generation", "model": model });
        yield Ok(Event::default().event("status").data(status.to_string()));

        while let Some(event) = stream.next().await {
            match event {
                TextEvent::Delta(text) => {
                    let chunk = json!({ "chunk": text });
                    yield Ok(Event::default().event("data").data(chunk.to_string()));
                }
                TextEvent::Done => {
                    yield Ok(Event::default().event("done").data(json!({ "status": "complete" }).to_string()));
                    break;
                }
                TextEvent::Error(message) => {
                    warn!("assistant stream failed: {message}");
                    let body = json!({ "status": "error", "error": { "code": error_codes::GENERATION_FAILED, "message": message } });
                    yield Ok(Event::default().event("error").data(body.to_string()));
                    break;
                }
            }
        }
    };
    Sse::new(events).keep_alive(KeepAlive::default())
}
