//! Health, catalog and echo routes.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::server::AppState;

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /catalog`
pub async fn catalog(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "success", "data": state.catalog.app_view() }))
}

/// `POST /echo`
pub async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}
