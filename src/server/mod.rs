//! HTTP boundary.
//!
//! ## Endpoints
//!
//! - `GET /health`, `GET /catalog`, `POST /echo`
//! - `POST /device/register`, `GET /device/list`, `GET /device/{id}`
//! - `PUT|DELETE /device/{id}/name`
//! - `POST /device/heartbeat`, `POST /device/connection-status`
//! - `POST /lm/generate`, `POST /stt/transcribe`, `POST /ai/process`
//! - `POST /lm/query`
//!
//! Every request first passes through [`activity::track_device_activity`].

pub mod activity;
pub mod error;
pub mod routes;
pub mod sse;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use echohub_devices::DeviceRegistry;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::assistant::Orchestrator;
use crate::catalog::CatalogService;
use crate::config::ServerConfig;
use crate::error::{HubError, Result};
use crate::llm::TextBackend;
use crate::stt::SpeechBackend;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DeviceRegistry>,
    pub catalog: Arc<CatalogService>,
    pub orchestrator: Arc<Orchestrator>,
    pub text: Arc<dyn TextBackend>,
    pub speech: Arc<dyn SpeechBackend>,
    /// STT model used when a request names none.
    pub default_stt_model: String,
}

/// Build the router with all routes and the device-activity layer.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(routes::status::health))
        .route("/catalog", get(routes::status::catalog))
        .route("/echo", post(routes::status::echo))
        .route("/device/register", post(routes::devices::register))
        .route("/device/list", get(routes::devices::list))
        .route("/device/heartbeat", post(routes::devices::heartbeat))
        .route(
            "/device/connection-status",
            post(routes::devices::connection_status),
        )
        .route("/device/{id}", get(routes::devices::get))
        .route(
            "/device/{id}/name",
            put(routes::devices::rename).delete(routes::devices::clear_name),
        )
        .route("/lm/generate", post(routes::generation::generate))
        .route("/lm/query", post(routes::assistant::query))
        .route("/stt/transcribe", post(routes::generation::transcribe))
        .route("/ai/process", post(routes::generation::process))
        .layer(from_fn_with_state(
            state.clone(),
            activity::track_device_activity,
        ))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Running HTTP server. Dropping it stops the server task.
pub struct ApiServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ApiServer {
    /// Bind `{host}:{port}` (port `0` picks a free port) and serve in a
    /// background task.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Server`] if the listener cannot bind.
    pub async fn start(state: AppState, config: &ServerConfig) -> Result<Self> {
        let app = router(state, config.max_body_bytes);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| HubError::Server(format!("bind {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| HubError::Server(format!("failed to get local addr: {e}")))?;

        info!("echohub listening on http://{addr}");

        let handle = tokio::spawn(async move {
            let service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                tracing::error!("HTTP server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
