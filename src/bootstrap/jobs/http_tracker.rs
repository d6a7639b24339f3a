//! Job that runs the HTTP tracker.
use std::sync::Arc;
use std::time::Duration;

use reef_tracker_configuration::HttpTracker;
use tokio::task::JoinHandle;
use tracing::error;

use crate::core::Tracker;
use crate::servers::http::server;
use crate::servers::http::v1::responses::stats::ProtocolToggles;

#[must_use]
pub fn start_job(config: &HttpTracker, tracker: Arc<Tracker>, protocols: ProtocolToggles) -> JoinHandle<()> {
    let bind_address = config.bind_address.clone();
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    tokio::spawn(async move {
        if let Err(e) = server::start(&bind_address, tracker, request_timeout, protocols).await {
            error!("HTTP tracker on {bind_address} died: {e}");
        }
    })
}
