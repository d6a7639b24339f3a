//! Job that runs the UDP tracker.
use std::sync::Arc;
use std::time::Duration;

use reef_tracker_configuration::UdpTracker;
use tokio::task::JoinHandle;
use tracing::error;

use crate::core::Tracker;
use crate::servers::udp::server;

#[must_use]
pub fn start_job(config: &UdpTracker, tracker: Arc<Tracker>) -> JoinHandle<()> {
    let bind_address = config.bind_address.clone();
    let cookie_lifetime = Duration::from_secs(config.cookie_lifetime_secs);
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    tokio::spawn(async move {
        if let Err(e) = server::start(&bind_address, tracker, cookie_lifetime, request_timeout).await {
            error!("UDP tracker on {bind_address} died: {e}");
        }
    })
}
