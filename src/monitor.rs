//! Periodic offline sweep.
//!
//! [`StatusMonitor`] calls [`DeviceRegistry::update_device_statuses`] on a
//! fixed interval so devices that stop sending traffic go offline.

use std::sync::Arc;
use std::time::Duration;

use echohub_devices::DeviceRegistry;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Background task that marks silent devices offline.
pub struct StatusMonitor {
    registry: Arc<DeviceRegistry>,
    cancel: CancellationToken,
    interval: Duration,
}

impl StatusMonitor {
    pub fn new(registry: Arc<DeviceRegistry>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            registry,
            cancel,
            interval,
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Sweep every interval until cancelled. The first sweep happens one
    /// interval after start.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "status monitor started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("status monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let flipped = self.registry.update_device_statuses();
                    if flipped > 0 {
                        info!(flipped, "devices marked offline");
                    } else {
                        debug!("status sweep: no changes");
                    }
                }
            }
        }
    }
}
