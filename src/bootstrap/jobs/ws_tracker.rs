//! Job that runs the WebSocket tracker.
use std::sync::Arc;
use std::time::Duration;

use reef_tracker_configuration::WsTracker;
use tokio::task::JoinHandle;
use tracing::error;

use crate::core::Tracker;
use crate::servers::ws::registry::Registry;
use crate::servers::ws::server;

#[must_use]
pub fn start_job(config: &WsTracker, tracker: Arc<Tracker>, registry: Arc<Registry>) -> JoinHandle<()> {
    let bind_address = config.bind_address.clone();
    let idle_timeout = Duration::from_secs(config.idle_timeout_secs);

    tokio::spawn(async move {
        if let Err(e) = server::start(&bind_address, tracker, registry, idle_timeout).await {
            error!("WebSocket tracker on {bind_address} died: {e}");
        }
    })
}
