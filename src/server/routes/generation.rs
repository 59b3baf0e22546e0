//! Language-model and speech routes.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::json_or_default;
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::server::sse::text_events;

/// Multipart field carrying the audio file.
const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateBody {
    pub prompt: Option<String>,
    pub model_name: Option<String>,
    pub stream: bool,
}

/// Generate with the text backend, as JSON or as an SSE stream.
async fn respond_with_generation(
    state: &AppState,
    prompt: &str,
    model_name: Option<&str>,
    stream: bool,
    extra: serde_json::Map<String, serde_json::Value>,
) -> Result<Response, ApiError> {
    let model = state.catalog.resolve_lm(model_name);
    info!(model = %model, stream, "generating text");

    if stream {
        let events = state.text.stream(&model, prompt).await?;
        return Ok(text_events(events).into_response());
    }

    let text = state.text.generate(&model, prompt).await?;
    let mut body = json!({ "status": "success", "model": model, "response": text });
    if let Some(map) = body.as_object_mut() {
        map.extend(extra);
    }
    Ok(Json(body).into_response())
}

/// `POST /lm/generate`
pub async fn generate(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let body: GenerateBody = json_or_default(&body);
    let prompt = body
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: prompt".into()))?;
    respond_with_generation(
        &state,
        &prompt,
        body.model_name.as_deref(),
        body.stream,
        serde_json::Map::new(),
    )
    .await
}

/// An uploaded audio file plus the text fields sent alongside it.
#[derive(Debug, Default)]
pub struct Upload {
    pub audio: Option<NamedTempFile>,
    pub fields: HashMap<String, String>,
}

impl Upload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Drain a multipart body, staging the audio part in a `.wav` temp file
/// that is removed when the [`Upload`] is dropped.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        if name == AUDIO_FIELD {
            let data = field.bytes().await?;
            let file = tempfile::Builder::new()
                .prefix("echohub-audio-")
                .suffix(".wav")
                .tempfile()?;
            tokio::fs::write(file.path(), &data).await?;
            debug!(bytes = data.len(), path = %file.path().display(), "staged audio upload");
            upload.audio = Some(file);
        } else {
            let value = field.text().await?;
            upload.fields.insert(name, value);
        }
    }
    Ok(upload)
}

/// Transcribe the staged audio with the requested (or default) STT model.
async fn transcribe_upload(state: &AppState, upload: &Upload) -> Result<(String, String), ApiError> {
    let audio = upload
        .audio
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("No audio file provided".into()))?;
    let requested = upload
        .field("stt_model_name")
        .unwrap_or(&state.default_stt_model);
    let (model_name, repo) = state.catalog.resolve_stt(requested)?;
    let text = state
        .speech
        .transcribe(audio.path(), &repo, upload.field("language"))
        .await;
    info!(model = %model_name, chars = text.len(), "transcription complete");
    Ok((model_name, text))
}

/// `POST /stt/transcribe`
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let upload = read_upload(multipart).await?;
    let (model, text) = transcribe_upload(&state, &upload).await?;
    Ok(Json(json!({ "status": "success", "model": model, "text": text })))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// `POST /ai/process`
///
/// Multipart requests transcribe `audio` and send the transcript (after an
/// optional `prompt`) to the text backend. JSON requests take `prompt`
/// directly. Either form may ask for an SSE stream.
pub async fn process(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let upload = read_upload(multipart).await?;
        let (stt_model, transcript) = transcribe_upload(&state, &upload).await?;
        if transcript.is_empty() {
            return Ok(Json(json!({
                "status": "success",
                "transcript": "",
                "response": "",
                "stt_model": stt_model,
            }))
            .into_response());
        }

        let prompt = match upload.field("prompt") {
            Some(instruction) => format!("{instruction}\n\n{transcript}"),
            None => transcript.clone(),
        };
        let mut extra = serde_json::Map::new();
        extra.insert("transcript".into(), transcript.into());
        extra.insert("stt_model".into(), stt_model.into());
        return respond_with_generation(
            &state,
            &prompt,
            upload.field("model_name"),
            truthy(upload.field("stream")),
            extra,
        )
        .await;
    }

    let bytes = axum::body::Bytes::from_request(request, &state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let body: GenerateBody = json_or_default(&bytes);
    let prompt = body
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Provide an audio file or a prompt".into()))?;
    respond_with_generation(
        &state,
        &prompt,
        body.model_name.as_deref(),
        body.stream,
        serde_json::Map::new(),
    )
    .await
}
