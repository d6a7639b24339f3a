//! Reef Tracker application.
//!
//! A container for the running jobs. Depending on the configuration it
//! starts:
//!
//! - The HTTP tracker.
//! - The UDP tracker.
//! - The WebSocket tracker.
//! - The peer expirer.
use tokio::task::JoinHandle;

use crate::bootstrap::app::AppContainer;
use crate::bootstrap::jobs::{http_tracker, peer_expirer, udp_tracker, ws_tracker};
use crate::servers::http::v1::responses::stats::ProtocolToggles;

/// Starts every enabled job and returns their handles so the caller can
/// wait for them.
#[must_use]
pub fn start(container: &AppContainer) -> Vec<JoinHandle<()>> {
    let mut jobs: Vec<JoinHandle<()>> = Vec::new();

    let config = &container.configuration;

    let protocols = ProtocolToggles {
        http: config.http_tracker.enabled,
        udp: config.udp_tracker.enabled,
        websocket: config.ws_tracker.enabled,
    };

    if config.http_tracker.enabled {
        jobs.push(http_tracker::start_job(&config.http_tracker, container.tracker.clone(), protocols));
    }

    if config.udp_tracker.enabled {
        jobs.push(udp_tracker::start_job(&config.udp_tracker, container.tracker.clone()));
    }

    if config.ws_tracker.enabled {
        jobs.push(ws_tracker::start_job(
            &config.ws_tracker,
            container.tracker.clone(),
            container.ws_registry.clone(),
        ));
    }

    if config.core.inactive_peer_cleanup_interval > 0 {
        jobs.push(peer_expirer::start_job(
            config.core.inactive_peer_cleanup_interval,
            &container.tracker,
        ));
    }

    jobs
}
