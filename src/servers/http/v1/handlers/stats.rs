//! Axum handler for the `stats` request.
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::http::HeaderMap;
use axum::response::Response;

use crate::core::Tracker;
use crate::servers::http::v1::responses::stats::{ProtocolToggles, Stats};

/// It handles the `stats` request: a JSON snapshot when the `Accept` header
/// asks for `application/json`, plaintext otherwise.
pub async fn handle(State((tracker, protocols)): State<(Arc<Tracker>, ProtocolToggles)>, headers: HeaderMap) -> Response {
    let swarm_metrics = tracker.get_metrics();
    let request_metrics = tracker.get_request_metrics().await.clone();

    let accept = headers.get(ACCEPT).and_then(|value| value.to_str().ok());

    Stats::new(swarm_metrics, request_metrics, protocols).into_response_for(accept)
}
