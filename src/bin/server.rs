//! echohub HTTP server.
//!
//! ```text
//! usage: echohub-server [--config <path>]
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use echohub::assistant::{Orchestrator, PromptTemplates};
use echohub::catalog::CatalogService;
use echohub::llm::GeminiAdapter;
use echohub::monitor::StatusMonitor;
use echohub::stt::WhisperHttpBackend;
use echohub::{ApiServer, AppState, DeviceRegistry, HubConfig, logging, secrets};
use echohub_devices::JsonStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn print_usage() {
    println!("usage: echohub-server [--config <path>]");
}

/// Parse `--config <path>` / `--config=<path>`. `Ok(None)` means help was printed.
fn parse_args() -> anyhow::Result<Option<Option<PathBuf>>> {
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            "-c" | "--config" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            other => match other.strip_prefix("--config=") {
                Some(path) => config = Some(PathBuf::from(path)),
                None => anyhow::bail!("unknown argument: {other}"),
            },
        }
    }
    Ok(Some(config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(config_path) = parse_args()? else {
        return Ok(());
    };

    let config = HubConfig::load(config_path.as_deref()).context("failed to load config")?;
    config.validate().context("invalid config")?;
    let _log_guard = logging::init(&config.logging)?;

    info!("echohub {} starting", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(DeviceRegistry::new(
        &config.registry,
        Some(JsonStore::new(config.registry_path())),
    ));

    let api_key = secrets::resolve_gemini_api_key(&config.gemini, &config.secrets_file());
    if api_key.is_none() {
        warn!("no Gemini API key configured; language model routes will fail");
    }
    let text = Arc::new(GeminiAdapter::new(api_key).with_base_url(&config.gemini.base_url));
    let speech = Arc::new(WhisperHttpBackend::new(&config.stt));

    let catalog = Arc::new(CatalogService::open(config.catalog_path()));
    if config.catalog.refresh_on_startup {
        if let Err(e) = catalog.refresh(text.as_ref(), speech.as_ref()).await {
            warn!("model catalog refresh failed: {e}");
        }
    }

    let templates = PromptTemplates::load(&config.templates_dir())
        .context("failed to load prompt templates")?;
    let orchestrator = Arc::new(Orchestrator::new(
        text.clone(),
        registry.clone(),
        templates,
        config.assistant.model.clone(),
    ));

    let stats = registry.stats();
    info!(
        "loaded devices: {} total, {} online, {} offline",
        stats.total_devices, stats.online_devices, stats.offline_devices
    );

    let cancel = CancellationToken::new();
    let monitor = StatusMonitor::new(
        registry.clone(),
        Duration::from_secs(config.registry.sweep_interval_secs),
        cancel.child_token(),
    )
    .spawn();

    let state = AppState {
        registry: registry.clone(),
        catalog,
        orchestrator,
        text,
        speech,
        default_stt_model: config.stt.default_model.clone(),
    };
    let server = ApiServer::start(state, &config.server).await?;
    info!("serving on port {}", server.port());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    cancel.cancel();
    server.shutdown();
    if let Err(e) = monitor.await {
        warn!("status monitor ended abnormally: {e}");
    }
    registry.flush();
    info!("echohub stopped");
    Ok(())
}
