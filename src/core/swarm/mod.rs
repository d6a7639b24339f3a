//! The in-memory swarm state: one [`Swarm`] per torrent, owned by the
//! process-wide [`Registry`].
//!
//! All peer coordination happens here. The registry offers an atomic
//! "update the peer and give me the peer list" primitive; everything else
//! (authentication, credit accounting, response encoding) happens outside
//! the per-swarm lock.
pub mod entry;
pub mod registry;

use std::panic::Location;
use std::sync::Arc;

use reef_tracker_primitives::peer::Peer;
use thiserror::Error;

pub use entry::Swarm;
pub use registry::Registry;

/// What an announce changed inside a swarm. Consumed by the statistics
/// keeper and the credit engine, which closes sessions on `Stopped` and on
/// evictions.
#[derive(Debug, Clone, Default)]
pub struct PeerDiff {
    pub change: PeerChange,
    /// The peer pushed out by the per-swarm cap to make room, if any.
    pub evicted: Option<Arc<Peer>>,
}

/// The state transition an announce caused for the announcing peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerChange {
    /// The peer entered the swarm.
    Started,
    /// A known peer refreshed its state.
    Updated,
    /// A known leecher became a seeder; the swarm completion counter was
    /// incremented.
    Completed,
    /// The peer asked not to be advertised.
    Paused,
    /// The peer left and was removed.
    Stopped,
    /// Nothing changed (e.g. `stopped` for a peer that was never there).
    #[default]
    NoOp,
}

/// Errors of swarm registry mutations, rendered by the dispatchers as
/// protocol failures.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// The registry refused to create one more swarm.
    #[error("tracker full")]
    TrackerFull,

    /// A known peer id announced from a new endpoint with a different key.
    #[error("peer key mismatch, {location}")]
    PeerKeyMismatch { location: &'static Location<'static> },
}
