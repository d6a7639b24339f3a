//! Primitive types for the Reef Tracker.
//!
//! This crate contains the basic data structures shared by the tracker core
//! and the delivery layers (HTTP, UDP and WebSocket trackers): torrent and
//! peer identities, announce events and swarm statistics.
use std::time::Duration;

pub mod announce_event;
pub mod info_hash;
pub mod peer;
pub mod swarm_metadata;

mod aggregate_metrics;

pub use aggregate_metrics::AggregateMetrics;

/// Duration since the Unix Epoch.
pub type DurationSinceUnixEpoch = Duration;

/// A number of bytes reported by a peer: the cumulative `uploaded`,
/// `downloaded` and `left` counters of an announce request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NumberOfBytes(pub i64);

/// The IP version used by a peer: IPv4 or IPv6.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum IPVersion {
    IPv4,
    IPv6,
}

/// The transport a peer announced over. WebSocket peers are reachable only
/// through the tracker relay, so delivery layers use this to decide which
/// peers can go into a compact peer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Http,
    Udp,
    WebSocket,
}
