use std::ops::AddAssign;

/// Aggregate metrics over every swarm the tracker holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, serde::Serialize)]
pub struct AggregateMetrics {
    /// Total number of swarms.
    pub torrents: u64,
    /// Swarms with at least one active peer.
    pub active_torrents: u64,
    /// Total number of seeders across all swarms.
    pub seeders: u64,
    /// Total number of leechers across all swarms.
    pub leechers: u64,
    /// Total number of completed downloads ever recorded.
    pub completed: u64,
}

impl AggregateMetrics {
    /// Total peers: every peer is either a seeder or a leecher.
    #[must_use]
    pub fn peers(&self) -> u64 {
        self.seeders + self.leechers
    }
}

impl AddAssign for AggregateMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.torrents += rhs.torrents;
        self.active_torrents += rhs.active_torrents;
        self.seeders += rhs.seeders;
        self.leechers += rhs.leechers;
        self.completed += rhs.completed;
    }
}
