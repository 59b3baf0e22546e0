//! `POST /lm/query`: the two-pass assistant.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::json_or_default;
use crate::assistant::{AssistantOutcome, error_codes};
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::server::sse::assistant_events;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryBody {
    pub user_query: Option<String>,
    pub source_device_mac: Option<String>,
    pub lm_model: Option<String>,
}

fn required(value: Option<String>, code: &'static str, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Coded {
            status: StatusCode::BAD_REQUEST,
            code,
            message: format!("Missing required field: {field}"),
        })
}

/// `POST /lm/query`
///
/// Text-generation requests stream as SSE; device commands and failures
/// return JSON (500 for failures).
pub async fn query(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let body: QueryBody = json_or_default(&body);
    let user_query = required(body.user_query, error_codes::MISSING_QUERY, "user_query")?;
    let source_mac = required(
        body.source_device_mac,
        error_codes::MISSING_SOURCE_MAC,
        "source_device_mac",
    )?;
    let lm_model = body.lm_model.filter(|m| !m.trim().is_empty());

    let span = info_span!("assistant", request_id = %Uuid::new_v4());
    let outcome = state
        .orchestrator
        .handle_request(&user_query, &source_mac, lm_model.as_deref())
        .instrument(span)
        .await;

    match outcome {
        AssistantOutcome::Stream(directive) => {
            let model = state.catalog.resolve_lm(directive.model.as_deref());
            info!(model = %model, "streaming text-generation response");
            let events = state.text.stream(&model, &directive.prompt).await?;
            Ok(assistant_events(events, model).into_response())
        }
        AssistantOutcome::Response(_) => Ok((StatusCode::OK, Json(outcome.to_json())).into_response()),
        AssistantOutcome::Failure(_) => {
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(outcome.to_json())).into_response())
        }
    }
}
