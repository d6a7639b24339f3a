//! HTTP server routes for version `v1`.
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use axum_client_ip::SecureClientIpSource;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;

use super::handlers::{announce, scrape, stats};
use super::responses::stats::ProtocolToggles;
use crate::core::Tracker;

/// It adds the routes to the router.
///
/// > **NOTICE**: a layer is added to get the client IP from the connection
/// > info, which the tracker uses when it is not behind a reverse proxy.
#[allow(clippy::needless_pass_by_value)]
pub fn router(tracker: Arc<Tracker>, request_timeout: Duration, protocols: ProtocolToggles) -> Router {
    Router::new()
        // Announce request
        .route("/announce", get(announce::handle).with_state(tracker.clone()))
        // Scrape request
        .route("/scrape", get(scrape::handle).with_state(tracker.clone()))
        // Stats
        .route("/stats", get(stats::handle).with_state((tracker, protocols)))
        // Add extension to get the client IP from the connection info
        .layer(SecureClientIpSource::ConnectInfo.into_extension())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
}
