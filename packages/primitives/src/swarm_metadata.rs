//! Per-swarm counters.
use serde::Serialize;

/// The counters one swarm reports: how many active peers hold the whole
/// torrent, how many are still downloading, and how many downloads were
/// ever finished against it.
///
/// Field names follow the rest of this codebase (and
/// [`AggregateMetrics`](crate::AggregateMetrics), which sums these over all
/// swarms). The scrape wire format of
/// [BEP 48](https://www.bittorrent.org/beps/bep_0048.html) calls the same
/// numbers `complete`, `incomplete` and `downloaded`; those names are
/// provided as accessors so only the response encoders speak the wire
/// vocabulary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize)]
pub struct SwarmMetadata {
    /// Active peers that hold the complete torrent.
    pub seeders: u32,
    /// Active peers that are still downloading.
    pub leechers: u32,
    /// Downloads ever completed against this swarm.
    pub completed: u32,
}

impl SwarmMetadata {
    /// The metadata of a swarm nobody has ever announced to, e.g. for a
    /// scrape of an unknown torrent.
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Every active peer is either a seeder or a leecher.
    #[must_use]
    pub fn peers(&self) -> u32 {
        self.seeders + self.leechers
    }

    /// BEP 48 `complete`: the number of seeders.
    #[must_use]
    pub fn complete(&self) -> u32 {
        self.seeders
    }

    /// BEP 48 `incomplete`: the number of leechers.
    #[must_use]
    pub fn incomplete(&self) -> u32 {
        self.leechers
    }

    /// BEP 48 `downloaded`: the number of downloads ever completed.
    #[must_use]
    pub fn downloaded(&self) -> u32 {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::SwarmMetadata;

    fn sample() -> SwarmMetadata {
        SwarmMetadata {
            seeders: 2,
            leechers: 3,
            completed: 5,
        }
    }

    #[test]
    fn every_active_peer_should_be_a_seeder_or_a_leecher() {
        assert_eq!(sample().peers(), 5);
    }

    #[test]
    fn the_wire_accessors_should_map_to_the_domain_fields() {
        let metadata = sample();

        assert_eq!(metadata.complete(), metadata.seeders);
        assert_eq!(metadata.incomplete(), metadata.leechers);
        assert_eq!(metadata.downloaded(), metadata.completed);
    }

    #[test]
    fn zeroed_metadata_should_report_no_peers() {
        assert_eq!(SwarmMetadata::zeroed().peers(), 0);
    }
}
