//! A single torrent's swarm: the peer table and its aggregate counters.
use std::collections::BTreeMap;
use std::panic::Location;
use std::sync::Arc;

use reef_tracker_primitives::announce_event::AnnounceEvent;
use reef_tracker_primitives::peer::{self, Peer};
use reef_tracker_primitives::swarm_metadata::SwarmMetadata;
use reef_tracker_primitives::DurationSinceUnixEpoch;

use super::{PeerChange, SwarmError};

/// The tracker entry for one torrent: every peer trying to download it, plus
/// the number of completed downloads ever seen.
///
/// Invariants kept by every mutation:
///
/// - at most one peer per peer id;
/// - `seeders + leechers == |peers|` (paused peers keep their class);
/// - counters change atomically with the peer table (the caller holds the
///   per-swarm lock for the whole mutation).
#[derive(Debug, Clone, Default)]
pub struct Swarm {
    peers: BTreeMap<peer::Id, Arc<Peer>>,
    /// The number of peers that have ever completed downloading this
    /// torrent.
    completions: u32,
    /// Last time anything announced against this swarm. Drives the
    /// empty-swarm grace interval.
    last_activity: DurationSinceUnixEpoch,
}

impl Swarm {
    /// Inserts, updates or removes the announcing peer and reports what
    /// changed. When the swarm is at `max_peers`, inserting a new peer
    /// evicts the least recently announced peer (never the requester) and
    /// returns it.
    ///
    /// # Errors
    ///
    /// Will return a `SwarmError::PeerKeyMismatch` if a known peer id shows
    /// up from a different endpoint without presenting the recorded key.
    pub fn upsert_peer(&mut self, peer: &Peer, max_peers: usize) -> Result<(PeerChange, Option<Arc<Peer>>), SwarmError> {
        self.last_activity = peer.updated;

        if peer.event == AnnounceEvent::Stopped {
            return Ok(match self.peers.remove(&peer.peer_id) {
                Some(_) => (PeerChange::Stopped, None),
                None => (PeerChange::NoOp, None),
            });
        }

        let previous = self.peers.get(&peer.peer_id).map(Arc::clone);

        if let Some(previous) = &previous {
            Self::check_peer_key(previous.as_ref(), peer)?;
        }

        let mut evicted = None;
        if previous.is_none() && self.peers.len() >= max_peers {
            evicted = self.evict_least_recently_announced(&peer.peer_id);
        }

        let mut stored = *peer;

        let change = match &previous {
            None => {
                if peer.event == AnnounceEvent::Paused {
                    PeerChange::Paused
                } else {
                    PeerChange::Started
                }
            }
            Some(previous) => match peer.event {
                AnnounceEvent::Completed => {
                    // Counted at most once per peer per session, and only
                    // for a real leecher-to-seeder transition.
                    if previous.event != AnnounceEvent::Completed && !previous.is_seeder() && peer.left.0 == 0 {
                        self.completions += 1;
                        PeerChange::Completed
                    } else {
                        PeerChange::Updated
                    }
                }
                AnnounceEvent::Paused => PeerChange::Paused,
                // A plain interval update does not unpause; only an
                // explicit event moves the peer out of the paused state.
                AnnounceEvent::None if previous.event == AnnounceEvent::Paused => {
                    stored.event = AnnounceEvent::Paused;
                    PeerChange::Paused
                }
                _ => PeerChange::Updated,
            },
        };

        self.peers.insert(stored.peer_id, Arc::new(stored));

        Ok((change, evicted))
    }

    /// A known peer id announcing from a new endpoint must present the key
    /// it registered with; otherwise anyone could detach a victim's peer
    /// entry by reusing its id.
    fn check_peer_key(previous: &Peer, incoming: &Peer) -> Result<(), SwarmError> {
        if previous.peer_addr == incoming.peer_addr {
            return Ok(());
        }

        match previous.key {
            Some(recorded) if incoming.key != Some(recorded) => Err(SwarmError::PeerKeyMismatch {
                location: Location::caller(),
            }),
            _ => Ok(()),
        }
    }

    fn evict_least_recently_announced(&mut self, requester: &peer::Id) -> Option<Arc<Peer>> {
        let victim = self
            .peers
            .values()
            .filter(|candidate| candidate.peer_id != *requester)
            .min_by_key(|candidate| candidate.updated)
            .map(|candidate| candidate.peer_id)?;

        self.peers.remove(&victim)
    }

    pub fn remove_peer(&mut self, peer_id: &peer::Id) -> Option<Arc<Peer>> {
        self.peers.remove(peer_id)
    }

    /// Removes every peer not seen since `cutoff` and returns them so the
    /// caller can emit the synthetic `stopped` diffs.
    pub fn remove_inactive_peers(&mut self, cutoff: DurationSinceUnixEpoch) -> Vec<Arc<Peer>> {
        let expired: Vec<Arc<Peer>> = self
            .peers
            .values()
            .filter(|peer| peer.updated <= cutoff)
            .map(Arc::clone)
            .collect();

        self.peers.retain(|_, peer| peer.updated > cutoff);

        expired
    }

    /// Selects up to `limit` peers for the requesting peer.
    ///
    /// The requester itself and paused peers are never returned. Seeders
    /// asking for peers get leechers first (seeders gain nothing from each
    /// other); leechers get seeders first. Remaining slots are filled by the
    /// most recently seen peers of the other class. `filter` lets the
    /// delivery layer drop peers it cannot hand out (e.g. WebSocket peers in
    /// a compact list).
    #[must_use]
    pub fn pick_peers_for<F>(&self, requester: &Peer, limit: usize, filter: F) -> Vec<Arc<Peer>>
    where
        F: Fn(&Peer) -> bool,
    {
        let requester_is_seeder = requester.is_seeder();

        let mut preferred: Vec<&Arc<Peer>> = Vec::new();
        let mut fallback: Vec<&Arc<Peer>> = Vec::new();

        for candidate in self.peers.values() {
            if candidate.peer_id == requester.peer_id || candidate.peer_addr == requester.peer_addr {
                continue;
            }
            if !candidate.is_advertised() || !filter(candidate.as_ref()) {
                continue;
            }

            if candidate.is_seeder() == requester_is_seeder {
                fallback.push(candidate);
            } else {
                preferred.push(candidate);
            }
        }

        preferred.sort_by(|a, b| b.updated.cmp(&a.updated));
        fallback.sort_by(|a, b| b.updated.cmp(&a.updated));

        preferred.into_iter().chain(fallback).take(limit).map(Arc::clone).collect()
    }

    /// The swarm counters: seeders, leechers and lifetime completions.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn metadata(&self) -> SwarmMetadata {
        let seeders = self.peers.values().filter(|peer| peer.is_seeder()).count();
        let leechers = self.peers.len() - seeders;

        SwarmMetadata {
            seeders: seeders as u32,
            leechers: leechers as u32,
            completed: self.completions,
        }
    }

    #[must_use]
    pub fn peers_is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    #[must_use]
    pub fn peers_len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn last_activity(&self) -> DurationSinceUnixEpoch {
        self.last_activity
    }

    #[must_use]
    pub fn completions(&self) -> u32 {
        self.completions
    }
}
