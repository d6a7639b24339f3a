//! Long-running jobs spawned at startup: one per delivery layer plus the
//! peer expirer. Every job ends gracefully on ctrl-c.
pub mod http_tracker;
pub mod peer_expirer;
pub mod udp_tracker;
pub mod ws_tracker;
