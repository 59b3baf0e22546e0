//! Gemini REST adapter.
//!
//! Talks to the Generative Language API directly over HTTPS:
//!
//! - `POST /v1beta/{model}:generateContent`
//! - `POST /v1beta/{model}:streamGenerateContent?alt=sse`
//! - `GET  /v1beta/models`
//!
//! The API key travels in the `x-goog-api-key` header so it never appears
//! in request URLs or logs.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::backend::{ModelListing, TextBackend};
use super::error::LlmError;
use super::events::{TextEvent, TextStream};
use super::sse::{SseDecoder, SseFrame};

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Upper bound on pages fetched when listing models.
const MAX_MODEL_PAGES: usize = 10;

/// Gemini text-generation backend.
pub struct GeminiAdapter {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAdapter")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl GeminiAdapter {
    /// Create an adapter. Without a key every call fails with
    /// [`LlmError::AuthError`].
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    /// Point the adapter at a different API root (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or_else(|| {
            LlmError::AuthError(
                "Gemini API key not configured; set GEMINI_API_KEY or secrets/apis.json".into(),
            )
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/{}:{method}", self.base_url, model_path(model))
    }

    async fn post(&self, url: &str, prompt: &str) -> Result<reqwest::Response, LlmError> {
        let key = self.api_key()?;
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, key)
            .json(&build_request_body(prompt))
            .send()
            .await
            .map_err(|e| LlmError::RequestError(format!("Gemini request failed: {e}")))?;
        check_status(response).await
    }
}

/// Map an HTTP error status to the appropriate [`LlmError`].
fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => LlmError::AuthError(format!("Gemini authentication failed: {message}")),
        429 => LlmError::RequestError(format!("Gemini rate limited: {message}")),
        code => LlmError::ProviderError(format!("Gemini HTTP {code}: {message}")),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_http_error(status, &body))
}

/// Extract `error.message` from a Google API error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Qualify a bare model name with the `models/` collection.
pub fn model_path(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_owned()
    } else {
        format!("models/{model}")
    }
}

/// Request body for a single-turn text prompt.
pub fn build_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": prompt}]
        }]
    })
}

/// Concatenate the text parts of the first candidate.
pub fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    Some(text)
}

fn block_reason(response: &Value) -> Option<&str> {
    response
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(Value::as_str)
}

#[async_trait]
impl TextBackend for GeminiAdapter {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let url = self.endpoint(model, "generateContent");
        debug!(model, "Gemini generateContent");
        let response = self.post(&url, prompt).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(format!("invalid Gemini response: {e}")))?;

        match extract_text(&body) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => match block_reason(&body) {
                Some(reason) => Err(LlmError::ResponseError(format!(
                    "Gemini blocked the prompt: {reason}"
                ))),
                None => Err(LlmError::ResponseError(
                    "Gemini response contained no text".into(),
                )),
            },
        }
    }

    async fn stream(&self, model: &str, prompt: &str) -> Result<TextStream, LlmError> {
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        debug!(model, "Gemini streamGenerateContent");
        let response = self.post(&url, prompt).await?;
        Ok(Box::pin(create_text_stream(response.bytes_stream())))
    }

    async fn list_models(&self) -> Result<Vec<ModelListing>, LlmError> {
        let key = self.api_key()?;
        let mut listings = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let mut request = self
                .client
                .get(format!("{}/v1beta/models", self.base_url))
                .header(API_KEY_HEADER, key)
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = request
                .send()
                .await
                .map_err(|e| LlmError::RequestError(format!("Gemini model list failed: {e}")))?;
            let body: Value = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| LlmError::ResponseError(format!("invalid model list: {e}")))?;

            listings.extend(parse_model_list(&body));

            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(String::from);
            if page_token.is_none() {
                break;
            }
        }
        Ok(listings)
    }
}

/// Keep models that support `generateContent` and whose short name starts with `gemini`.
pub fn parse_model_list(body: &Value) -> Vec<ModelListing> {
    let Some(models) = body.get("models").and_then(Value::as_array) else {
        return Vec::new();
    };
    models
        .iter()
        .filter_map(|m| {
            let name = m.get("name")?.as_str()?;
            let generates = m
                .get("supportedGenerationMethods")?
                .as_array()?
                .iter()
                .any(|method| method.as_str() == Some("generateContent"));
            let short = name.rsplit('/').next().unwrap_or(name);
            (generates && short.starts_with("gemini")).then(|| ModelListing::new(short, name))
        })
        .collect()
}

/// Internal state for the text stream.
struct StreamState {
    byte_stream: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    decoder: SseDecoder,
    pending: VecDeque<TextEvent>,
    finished: bool,
}

impl StreamState {
    fn finish_with(&mut self, event: TextEvent) {
        if !self.finished {
            self.pending.push_back(event);
            self.finished = true;
        }
    }

    fn absorb(&mut self, frame: SseFrame) {
        if self.finished {
            return;
        }
        if frame.is_done() {
            self.finish_with(TextEvent::Done);
            return;
        }
        let value: Value = match serde_json::from_str(&frame.data) {
            Ok(v) => v,
            Err(e) => {
                warn!("skipping unparseable Gemini stream frame: {e}");
                return;
            }
        };
        if value.get("error").is_some() {
            self.finish_with(TextEvent::Error(extract_error_message(&frame.data)));
            return;
        }
        if let Some(text) = extract_text(&value).filter(|t| !t.is_empty()) {
            self.pending.push_back(TextEvent::Delta(text));
        }
    }
}

/// Turn a Gemini SSE byte stream into [`TextEvent`]s.
fn create_text_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = TextEvent> + Send {
    futures_util::stream::unfold(
        StreamState {
            byte_stream: Box::pin(byte_stream),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Some((event, state));
                }
                if state.finished {
                    return None;
                }
                match state.byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.feed(&chunk) {
                            state.absorb(frame);
                        }
                    }
                    Some(Err(e)) => {
                        state.finish_with(TextEvent::Error(format!("stream read error: {e}")));
                    }
                    None => {
                        if let Some(frame) = state.decoder.finish() {
                            state.absorb(frame);
                        }
                        state.finish_with(TextEvent::Done);
                    }
                }
            }
        },
    )
}
