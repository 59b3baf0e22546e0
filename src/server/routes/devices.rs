//! `/device/*` routes: registration, lookup, naming, heartbeats.

use std::net::SocketAddr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use echohub_devices::RegistrationRequest;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::json_or_default;
use crate::server::AppState;
use crate::server::activity::device_headers;
use crate::server::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterBody {
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub model_name: Option<String>,
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
    pub device_type: Option<String>,
    pub parent_device: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// `POST /device/register`
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body: RegisterBody = json_or_default(&body);
    let (Some(device_id), Some(device_name), Some(model_name)) = (
        present(body.device_id),
        present(body.device_name),
        present(body.model_name),
    ) else {
        return Err(ApiError::BadRequest(
            "Missing required fields: device_id, device_name, model_name".into(),
        ));
    };
    let ip_address = present(body.ip_address).unwrap_or_else(|| peer.ip().to_string());

    let mut request = RegistrationRequest::new(device_id, device_name, model_name, ip_address);
    if let Some(mac) = present(body.mac_address) {
        request = request.with_mac(mac);
    }
    if let Some(device_type) = present(body.device_type) {
        request = request.with_device_type(device_type);
    }
    if let Some(parent) = present(body.parent_device) {
        request = request.with_parent(parent);
    }

    let device = state.registry.register(request);
    info!(device_id = %device.device_id, mac = %device.mac_address, "device registered");
    Ok(Json(json!({
        "status": "success",
        "message": "Device registered",
        "device": device,
    })))
}

/// `GET /device/list`
pub async fn list(State(state): State<AppState>) -> Json<Value> {
    let devices = state.registry.get_all();
    let stats = state.registry.stats();
    Json(json!({
        "status": "success",
        "count": devices.len(),
        "devices": devices,
        "stats": stats,
    }))
}

/// `GET /device/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let device = state
        .registry
        .get_device(&identifier)
        .ok_or_else(|| ApiError::NotFound("Device not found".into()))?;
    Ok(Json(json!({ "status": "success", "device": device })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenameBody {
    pub custom_name: Option<String>,
    pub updated_by_device_id: Option<String>,
}

/// `PUT /device/{id}/name`
pub async fn rename(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body: RenameBody = json_or_default(&body);
    let custom_name = present(body.custom_name)
        .ok_or_else(|| ApiError::BadRequest("Missing required field: custom_name".into()))?;
    let updated_by = present(body.updated_by_device_id)
        .or_else(|| device_headers(&headers).device_id)
        .ok_or_else(|| ApiError::BadRequest("Missing updated_by_device_id".into()))?;

    let device = state
        .registry
        .update_custom_name(&identifier, &custom_name, &updated_by)
        .ok_or_else(|| ApiError::NotFound(format!("Device not found: {identifier}")))?;
    Ok(Json(json!({
        "status": "success",
        "device": device,
        "message": "Device name updated",
        "broadcast": true,
    })))
}

/// `DELETE /device/{id}/name`
pub async fn clear_name(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let device = state
        .registry
        .clear_custom_name(&identifier)
        .ok_or_else(|| ApiError::NotFound(format!("Device not found: {identifier}")))?;
    Ok(Json(json!({
        "status": "success",
        "device": device,
        "message": "Custom name cleared",
        "broadcast": true,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HeartbeatBody {
    pub connected_devices: Vec<String>,
}

/// `POST /device/heartbeat`
pub async fn heartbeat(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let identity = device_headers(&headers);
    let identifier = identity
        .identifier()
        .map(String::from)
        .ok_or_else(|| {
            ApiError::BadRequest("Missing device identifier (X-Device-MAC or X-Device-Id)".into())
        })?;

    if !state.registry.update_last_seen(&identifier) {
        debug!(identifier = %identifier, "heartbeat from unknown device, trying auto-registration");
        let device = state
            .registry
            .auto_register_from_headers(&identity, &peer.ip().to_string())
            .ok_or_else(|| {
                ApiError::NotFound("Device not found and auto-registration failed".into())
            })?;
        info!(device_id = %device.device_id, "auto-registered device on heartbeat");
    }

    let body: HeartbeatBody = json_or_default(&body);
    for accessory in body
        .connected_devices
        .iter()
        .filter(|mac| !mac.is_empty() && **mac != identifier)
    {
        let updated = state.registry.update_last_seen(accessory);
        debug!(accessory = %accessory, updated, "connected accessory refreshed");
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Heartbeat received",
        "device_identifier": identifier,
        "connected_devices_updated": body.connected_devices.len(),
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionStatusBody {
    pub connected: Vec<String>,
    pub disconnected: Vec<String>,
}

/// `POST /device/connection-status`
///
/// Connected accessories are refreshed; disconnected ones are only logged and
/// go offline through the regular sweep.
pub async fn connection_status(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let body: ConnectionStatusBody = json_or_default(&body);
    let mut updated_count = body
        .connected
        .iter()
        .filter(|mac| state.registry.update_last_seen(mac))
        .count();
    for mac in &body.disconnected {
        info!(mac = %mac, "device disconnected");
        updated_count += 1;
    }
    Json(json!({
        "status": "success",
        "updated_count": updated_count,
        "connected": body.connected.len(),
        "disconnected": body.disconnected.len(),
    }))
}
