//! Axum [`extractors`](axum::extract) for the HTTP tracker requests.
pub mod announce_request;
pub mod client_ip_sources;
pub mod scrape_request;
