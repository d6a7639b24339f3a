//! Data structures and logic to build the HTTP responses.
pub mod announce;
pub mod error;
pub mod scrape;
pub mod stats;
