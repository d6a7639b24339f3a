//! Job that evicts inactive peers on a fixed interval.
//!
//! Peers that have not announced for `peer_ttl_secs` (default 1200s, twice
//! the default announce interval) are removed as if they had announced
//! `stopped`: their credit session closes and an expiry event goes to the
//! observability sink. Swarms left empty past the grace interval are
//! dropped with them.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::core::Tracker;

#[must_use]
pub fn start_job(interval_secs: u64, tracker: &Arc<Tracker>) -> JoinHandle<()> {
    let weak_tracker = Arc::downgrade(tracker);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.tick().await;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping peer expirer job ..");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(tracker) = weak_tracker.upgrade() {
                        let start_time = Utc::now().time();
                        tracker.cleanup_torrents();
                        info!("Evicted inactive peers in: {}ms", (Utc::now().time() - start_time).num_milliseconds());
                    } else {
                        break;
                    }
                }
            }
        }
    })
}
