//! Axum handler for the `scrape` request.
use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::core::statistics::Event;
use crate::core::{ScrapeRequest, Tracker};
use crate::servers::http::v1::extractors::client_ip_sources::Extract as ExtractClientIpSources;
use crate::servers::http::v1::extractors::scrape_request::ExtractRequest;
use crate::servers::http::v1::responses::{self, scrape};

/// It handles the `scrape` request.
pub async fn handle(
    State(tracker): State<Arc<Tracker>>,
    ExtractRequest(scrape_request): ExtractRequest,
    ExtractClientIpSources(client_ip_sources): ExtractClientIpSources,
) -> Response {
    debug!("http scrape request: {:#?}", scrape_request);

    let request = ScrapeRequest {
        info_hashes: scrape_request.info_hashes,
        auth_token: scrape_request.auth_token,
    };

    let scrape_data = match tracker.scrape(request).await {
        Ok(scrape_data) => scrape_data,
        Err(error) => return responses::error::Error::from(error).into_response(),
    };

    match client_ip_sources.connection_info_ip {
        Some(IpAddr::V6(_)) => {
            tracker.send_stats_event(Event::Tcp6Scrape).await;
        }
        _ => {
            tracker.send_stats_event(Event::Tcp4Scrape).await;
        }
    }

    scrape::Bencoded::from(scrape_data).into_response()
}
