//! Data structures and logic for parsing the HTTP requests.
pub mod announce;
pub mod scrape;
