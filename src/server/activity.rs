//! Device-activity layer applied to every request.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use echohub_devices::{DeviceHeaders, DeviceRegistry};
use tracing::{debug, warn};

use super::AppState;

/// Read device identity headers.
pub fn device_headers(headers: &HeaderMap) -> DeviceHeaders {
    DeviceHeaders::from_lookup(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    })
}

/// Peer IP recorded by `into_make_service_with_connect_info`.
pub fn peer_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Refresh a known caller's `last_seen`, or auto-register it from headers.
///
/// Registry writes persist synchronously, so they run on the blocking pool.
pub async fn track_device_activity(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let headers = device_headers(request.headers());
    if headers.identifier().is_some() {
        let registry = state.registry.clone();
        let ip = peer_ip(&request);
        let tracked = tokio::task::spawn_blocking(move || record_activity(&registry, &headers, &ip));
        if let Err(e) = tracked.await {
            warn!("device activity tracking failed: {e}");
        }
    }
    next.run(request).await
}

/// Blocking half of [`track_device_activity`].
pub fn record_activity(registry: &DeviceRegistry, headers: &DeviceHeaders, ip: &str) {
    let Some(identifier) = headers.identifier() else {
        return;
    };
    if registry.update_last_seen(identifier) {
        debug!(identifier, "activity from known device");
    } else if let Some(record) = registry.auto_register_from_headers(headers, ip) {
        debug!(device_id = %record.device_id, "auto-registered device from headers");
    }
}
