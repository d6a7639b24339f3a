//! The top-level `info_hash -> Swarm` map.
//!
//! Lookups are lock-free (`crossbeam_skiplist::SkipMap`); each swarm carries
//! its own mutex, taken only for the in-memory mutation and peer-list
//! computation. Nothing does I/O while a swarm lock is held.
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_skiplist::SkipMap;
use reef_tracker_configuration::SwarmPolicy;
use reef_tracker_primitives::announce_event::AnnounceEvent;
use reef_tracker_primitives::info_hash::InfoHash;
use reef_tracker_primitives::peer::{self, Peer};
use reef_tracker_primitives::swarm_metadata::SwarmMetadata;
use reef_tracker_primitives::{AggregateMetrics, DurationSinceUnixEpoch};

use super::{PeerDiff, Swarm, SwarmError};

/// Width of the expiry buckets. Coarse on purpose: a bucket only tells the
/// expirer which swarms saw announces in that window, the actual cutoff
/// check still runs per peer.
const EXPIRY_BUCKET_WIDTH_SECS: u64 = 60;

/// The process-wide swarm registry.
pub struct Registry {
    swarms: SkipMap<InfoHash, Arc<Mutex<Swarm>>>,
    swarm_count: AtomicUsize,
    policy: SwarmPolicy,
    /// Time wheel for the expirer: bucket index -> swarms that saw announces
    /// in that window. The expirer only visits swarms from buckets old
    /// enough to possibly hold expired peers, instead of scanning the whole
    /// registry.
    expiry_buckets: Mutex<BTreeMap<u64, HashSet<InfoHash>>>,
}

impl Registry {
    #[must_use]
    pub fn new(policy: SwarmPolicy) -> Self {
        Self {
            swarms: SkipMap::new(),
            swarm_count: AtomicUsize::new(0),
            policy,
            expiry_buckets: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &SwarmPolicy {
        &self.policy
    }

    /// Atomically updates the peer and computes the response peer list.
    ///
    /// `limit` is the number of peers the caller wants back (already
    /// normalized from `numwant`); `filter` drops peers the delivery layer
    /// cannot hand out.
    ///
    /// # Errors
    ///
    /// Will return a `SwarmError` when the registry is at its swarm cap or
    /// the peer fails the spoofing check.
    pub fn announce<F>(
        &self,
        info_hash: &InfoHash,
        peer: &Peer,
        limit: usize,
        filter: F,
    ) -> Result<(SwarmMetadata, Vec<Arc<Peer>>, PeerDiff), SwarmError>
    where
        F: Fn(&Peer) -> bool,
    {
        let entry = match self.swarms.get(info_hash) {
            Some(entry) => entry,
            None => {
                if self.swarm_count.load(Ordering::Relaxed) >= self.policy.max_swarms {
                    return Err(SwarmError::TrackerFull);
                }
                let entry = self.swarms.get_or_insert(*info_hash, Arc::default());
                // get_or_insert may race; counting the entry we actually
                // created keeps the counter an upper bound either way.
                self.swarm_count.fetch_add(1, Ordering::Relaxed);
                entry
            }
        };

        let swarm = entry.value();

        let (metadata, peers, diff) = {
            let mut swarm = swarm.lock().expect("swarm lock is never poisoned");

            let (change, evicted) = swarm.upsert_peer(peer, self.policy.max_peers_per_swarm)?;
            // A departing peer gets no peer list back.
            let peers = if peer.event == AnnounceEvent::Stopped {
                Vec::new()
            } else {
                swarm.pick_peers_for(peer, limit, filter)
            };
            let metadata = swarm.metadata();

            (metadata, peers, PeerDiff { change, evicted })
        };

        self.touch_expiry_bucket(info_hash, &peer.updated);

        Ok((metadata, peers, diff))
    }

    /// Pure read: swarm statistics for each requested torrent. Unknown
    /// torrents report zeroed metadata.
    #[must_use]
    pub fn scrape(&self, info_hashes: &[InfoHash]) -> BTreeMap<InfoHash, SwarmMetadata> {
        info_hashes
            .iter()
            .map(|info_hash| {
                let metadata = match self.swarms.get(info_hash) {
                    Some(entry) => entry.value().lock().expect("swarm lock is never poisoned").metadata(),
                    None => SwarmMetadata::zeroed(),
                };
                (*info_hash, metadata)
            })
            .collect()
    }

    /// Removes one peer, returning it when it was present. Used by
    /// `stopped` handling on relay-only paths and by tests; the expirer goes
    /// through [`remove_inactive_peers`](Self::remove_inactive_peers).
    pub fn remove_peer(&self, info_hash: &InfoHash, peer_id: &peer::Id) -> Option<Arc<Peer>> {
        let entry = self.swarms.get(info_hash)?;
        let removed = entry.value().lock().expect("swarm lock is never poisoned").remove_peer(peer_id);
        removed
    }

    /// Evicts every peer whose last announce is at or before `cutoff` and
    /// returns them together with their torrent, so the caller can emit the
    /// synthetic `stopped` diffs. Swarms that have been empty longer than
    /// the grace interval are dropped on the way.
    pub fn remove_inactive_peers(
        &self,
        cutoff: DurationSinceUnixEpoch,
        now: DurationSinceUnixEpoch,
    ) -> Vec<(InfoHash, Arc<Peer>)> {
        let candidates = self.take_expired_buckets(cutoff);

        let mut expired = Vec::new();

        for info_hash in candidates {
            let Some(entry) = self.swarms.get(&info_hash) else {
                continue;
            };

            let (removed, drop_swarm) = {
                let mut swarm = entry.value().lock().expect("swarm lock is never poisoned");
                let removed = swarm.remove_inactive_peers(cutoff);

                let empty_past_grace = swarm.peers_is_empty()
                    && now.saturating_sub(swarm.last_activity())
                        > std::time::Duration::from_secs(u64::from(self.policy.empty_swarm_grace_secs));

                (removed, empty_past_grace)
            };

            if drop_swarm && self.swarms.remove(&info_hash).is_some() {
                self.swarm_count.fetch_sub(1, Ordering::Relaxed);
            }

            for peer in removed {
                expired.push((info_hash, peer));
            }
        }

        expired
    }

    /// Aggregate gauges over the whole registry.
    #[must_use]
    pub fn metrics(&self) -> AggregateMetrics {
        let mut metrics = AggregateMetrics::default();

        for entry in &self.swarms {
            let swarm = entry.value().lock().expect("swarm lock is never poisoned");
            let metadata = swarm.metadata();

            metrics.torrents += 1;
            if !swarm.peers_is_empty() {
                metrics.active_torrents += 1;
            }
            metrics.seeders += u64::from(metadata.seeders);
            metrics.leechers += u64::from(metadata.leechers);
            metrics.completed += u64::from(metadata.completed);
        }

        metrics
    }

    fn touch_expiry_bucket(&self, info_hash: &InfoHash, announced_at: &DurationSinceUnixEpoch) {
        let bucket = announced_at.as_secs() / EXPIRY_BUCKET_WIDTH_SECS;

        self.expiry_buckets
            .lock()
            .expect("expiry wheel lock is never poisoned")
            .entry(bucket)
            .or_default()
            .insert(*info_hash);
    }

    /// Drains every bucket whose whole window is at or before the cutoff.
    /// A swarm that announced again later is also in a newer bucket, so
    /// draining old buckets never loses track of anyone.
    fn take_expired_buckets(&self, cutoff: DurationSinceUnixEpoch) -> HashSet<InfoHash> {
        let last_expired_bucket = cutoff.as_secs() / EXPIRY_BUCKET_WIDTH_SECS;

        let mut buckets = self.expiry_buckets.lock().expect("expiry wheel lock is never poisoned");

        let keep = buckets.split_off(&(last_expired_bucket + 1));
        let drained = std::mem::replace(&mut *buckets, keep);

        drained.into_values().flatten().collect()
    }
}
