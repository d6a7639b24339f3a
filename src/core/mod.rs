//! The core tracker module contains the generic `BitTorrent` tracker logic
//! which is independent of the delivery layer.
//!
//! It contains the tracker services and their dependencies. It's a domain
//! layer which does not specify how the end user connects to the tracker.
//! Typically this module is used by higher modules like:
//!
//! - An HTTP tracker
//! - A UDP tracker
//! - A WebSocket (WebTorrent) tracker
//!
//! ```text
//! Delivery layer       Domain layer
//!
//!     HTTP tracker |
//!      UDP tracker |>  Core tracker
//! WebSocket tracker|
//! ```
//!
//! # Announce requests
//!
//! Handling announce requests is the most important task for a `BitTorrent`
//! tracker. The stages of an accepted announce, in order:
//!
//! 1. **Authenticate**: resolve the `auth_token` through the user store
//!    (mandatory for private trackers).
//! 2. **Check the torrent**: private torrents require an authenticated user;
//!    inactive torrents are refused.
//! 3. **Mutate the swarm**: insert/update/remove the peer and compute the
//!    response peer list, atomically under the per-swarm lock.
//! 4. **Diff the credit session**: turn the cumulative counters into upload
//!    and download deltas.
//! 5. **Settle**: write the credit transactions through the ledger port,
//!    off the request path.
//!
//! Repository reads happen before the swarm lock is taken, the ledger write
//! happens after it is released; the only work under lock is the in-memory
//! peer table mutation and the peer list computation.
//!
//! # Scrape requests
//!
//! A scrape is a pure read of per-torrent swarm statistics:
//!
//! ```text
//! info_hash -> (seeders, leechers, completed downloads)
//! ```
//!
//! Unknown torrents report zeroed statistics. Scrapes never mutate state.
//!
//! # Statistics
//!
//! The tracker keeps per-protocol request counters (see [`statistics`]) and
//! live aggregate swarm gauges (see
//! [`AggregateMetrics`](reef_tracker_primitives::AggregateMetrics)), both
//! served by the `/stats` endpoint.
//!
//! # Persistence
//!
//! There is none. The swarm registry is rebuilt from client announces after
//! a restart, and every credit session starts fresh.
pub mod auth;
pub mod credit;
pub mod error;
pub mod repositories;
pub mod statistics;
pub mod swarm;

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::panic::Location;
use std::sync::Arc;

use reef_tracker_configuration::{AnnouncePolicy, Configuration, MAX_SCRAPE_TORRENTS, TORRENT_PEERS_LIMIT};
use reef_tracker_primitives::info_hash::InfoHash;
use reef_tracker_primitives::peer::Peer;
use reef_tracker_primitives::swarm_metadata::SwarmMetadata;
use reef_tracker_primitives::{AggregateMetrics, Transport};
use reef_tracker_clock::clock::Time;
use tokio::sync::mpsc::error::SendError;
use tracing::{debug, warn};

use self::auth::{AuthToken, Authenticator};
use self::credit::CreditEngine;
use self::error::Error;
use self::repositories::{Observability, TorrentRepository, TrackerEvent, UserProfile};
use self::swarm::{PeerDiff, Registry};
use crate::shared::bit_torrent::common::{DEFAULT_NUMWANT, MAX_NUMWANT};
use crate::CurrentClock;

/// The domain layer tracker service.
///
/// Its main responsibility is to handle the `announce` and `scrape`
/// requests. It's also a container for the tracker configuration, the
/// authenticator, the credit engine and the statistics services.
///
/// > **NOTICE**: the `Tracker` is not responsible for the network layer.
/// > It is used by higher application services that parse the wire formats
/// > and resolve the peer IP.
pub struct Tracker {
    announce_policy: AnnouncePolicy,
    private: bool,
    on_reverse_proxy: bool,
    external_ip: Option<IpAddr>,
    registry: Registry,
    authenticator: Authenticator,
    credit_engine: Arc<CreditEngine>,
    torrent_repository: Arc<dyn TorrentRepository>,
    observability: Arc<dyn Observability>,
    stats_event_sender: Option<Box<dyn statistics::EventSender>>,
    stats_repository: statistics::Repo,
}

/// An announce request normalized from any of the wire formats.
#[derive(Debug, Clone)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    /// The announcing peer, with its endpoint already resolved by the
    /// delivery layer and `updated` stamped.
    pub peer: Peer,
    /// Raw `numwant` from the request, when given.
    pub numwant: Option<usize>,
    pub auth_token: Option<AuthToken>,
}

/// Structure that holds the data returned to an `announce` request.
#[derive(Clone, Debug, Default, derive_more::Constructor)]
pub struct AnnounceData {
    /// The peers participating in the same torrent, excluding the peer that
    /// made the request.
    pub peers: Vec<Arc<Peer>>,
    /// Swarm statistics after the announce was applied.
    pub stats: SwarmMetadata,
    /// The tracker announce policy (intervals) to echo to the client.
    pub policy: AnnouncePolicy,
}

/// A scrape request normalized from any of the wire formats.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub info_hashes: Vec<InfoHash>,
    pub auth_token: Option<AuthToken>,
}

/// Structure that holds the data returned to a `scrape` request.
#[derive(Debug, PartialEq, Default)]
pub struct ScrapeData {
    /// A map of infohashes and swarm metadata for each torrent.
    pub files: BTreeMap<InfoHash, SwarmMetadata>,
}

impl ScrapeData {
    #[must_use]
    pub fn empty() -> Self {
        Self { files: BTreeMap::new() }
    }

    pub fn add_file(&mut self, info_hash: &InfoHash, swarm_metadata: SwarmMetadata) {
        self.files.insert(*info_hash, swarm_metadata);
    }

    pub fn add_file_with_zeroed_metadata(&mut self, info_hash: &InfoHash) {
        self.files.insert(*info_hash, SwarmMetadata::zeroed());
    }
}

impl Tracker {
    /// `Tracker` constructor.
    #[must_use]
    pub fn new(
        config: &Configuration,
        user_repository: Arc<dyn repositories::UserRepository>,
        torrent_repository: Arc<dyn TorrentRepository>,
        ledger: Arc<dyn repositories::Ledger>,
        observability: Arc<dyn Observability>,
        stats_event_sender: Option<Box<dyn statistics::EventSender>>,
        stats_repository: statistics::Repo,
    ) -> Tracker {
        Tracker {
            announce_policy: config.core.announce_policy,
            private: config.core.private,
            on_reverse_proxy: config.core.on_reverse_proxy,
            external_ip: config.core.external_ip,
            registry: Registry::new(config.core.swarm_policy),
            authenticator: Authenticator::new(user_repository),
            credit_engine: Arc::new(CreditEngine::new(config.core.credit_policy, ledger, observability.clone())),
            torrent_repository,
            observability,
            stats_event_sender,
            stats_repository,
        }
    }

    /// Returns `true` if the tracker requires an `auth_token` on every
    /// request.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.private
    }

    #[must_use]
    pub fn is_behind_reverse_proxy(&self) -> bool {
        self.on_reverse_proxy
    }

    #[must_use]
    pub fn get_announce_policy(&self) -> AnnouncePolicy {
        self.announce_policy
    }

    #[must_use]
    pub fn get_maybe_external_ip(&self) -> Option<IpAddr> {
        self.external_ip
    }

    /// It handles an announce request.
    ///
    /// BEP 03: [The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html).
    ///
    /// # Errors
    ///
    /// Will return an error when authentication fails, the torrent cannot be
    /// announced, or the swarm mutation is rejected. Every error maps to a
    /// protocol failure at the delivery layer.
    pub async fn announce(&self, request: AnnounceRequest) -> Result<AnnounceData, Error> {
        // Repository reads happen up front, never under the swarm lock.
        let profile = self.authenticate(request.auth_token.as_ref()).await?;
        self.check_torrent(&request.info_hash, profile.as_ref()).await?;

        let mut peer = request.peer;
        debug!("before: {peer:?}");
        peer.change_ip(&assign_ip_address_to_peer(&peer.ip(), self.external_ip));
        debug!("after: {peer:?}");

        let limit = request
            .numwant
            .unwrap_or(DEFAULT_NUMWANT)
            .min(MAX_NUMWANT)
            .min(TORRENT_PEERS_LIMIT);

        let requester_transport = peer.transport;
        let filter = move |candidate: &Peer| match requester_transport {
            // WebSocket peers are only reachable through the tracker relay,
            // TCP/UDP peers only over their socket address.
            Transport::WebSocket => candidate.transport == Transport::WebSocket,
            _ => candidate.transport != Transport::WebSocket,
        };

        let (stats, peers, diff) = self.registry.announce(&request.info_hash, &peer, limit, filter)?;

        self.apply_diff_side_effects(&request.info_hash, &diff);

        if let Some(profile) = &profile {
            let receivers = swarm_has_receivers(&peer, &stats);
            let transactions = self
                .credit_engine
                .process_announce(profile, &request.info_hash, &peer, receivers);

            if !transactions.is_empty() {
                // Fire and forget: accounting is never allowed to delay or
                // fail peer coordination.
                let engine = self.credit_engine.clone();
                tokio::spawn(async move { engine.settle(transactions).await });
            }
        }

        Ok(AnnounceData {
            peers,
            stats,
            policy: self.announce_policy,
        })
    }

    /// It handles a scrape request.
    ///
    /// BEP 48: [Tracker Protocol Extension: Scrape](https://www.bittorrent.org/beps/bep_0048.html).
    ///
    /// # Errors
    ///
    /// Will return an error when authentication fails on a private tracker
    /// or the request carries no `info_hash` at all.
    pub async fn scrape(&self, request: ScrapeRequest) -> Result<ScrapeData, Error> {
        let profile = self.authenticate(request.auth_token.as_ref()).await?;

        if request.info_hashes.is_empty() {
            // Full scrapes are not permitted; require at least one torrent.
            return Err(Error::EmptyScrape {
                location: Location::caller(),
            });
        }

        let mut scrape_data = ScrapeData::empty();

        for info_hash in request.info_hashes.iter().take(usize::from(MAX_SCRAPE_TORRENTS)) {
            let metadata = match self.check_torrent(info_hash, profile.as_ref()).await {
                Ok(()) => self
                    .registry
                    .scrape(std::slice::from_ref(info_hash))
                    .remove(info_hash)
                    .unwrap_or_else(SwarmMetadata::zeroed),
                // Unauthorized or unknown files scrape as zeroed entries.
                Err(_) => SwarmMetadata::zeroed(),
            };
            scrape_data.add_file(info_hash, metadata);
        }

        Ok(scrape_data)
    }

    /// Removes one peer as if it had announced `stopped`. Used by the
    /// WebSocket tracker when a connection closes.
    pub fn remove_peer(&self, info_hash: &InfoHash, peer_id: &reef_tracker_primitives::peer::Id) {
        if self.registry.remove_peer(info_hash, peer_id).is_some() {
            self.credit_engine.close_session_for_peer(info_hash, peer_id);
        }
    }

    /// Evicts peers past the TTL and emits the synthetic `stopped` side
    /// effects (session close, observability event). Runs on the expirer
    /// interval.
    pub fn cleanup_torrents(&self) {
        let now = CurrentClock::now();
        let ttl = std::time::Duration::from_secs(u64::from(self.registry.policy().peer_ttl_secs));
        let cutoff = now.saturating_sub(ttl);

        let expired = self.registry.remove_inactive_peers(cutoff, now);

        for (info_hash, peer) in expired {
            self.credit_engine.close_session_for_peer(&info_hash, &peer.peer_id);
            self.observability.emit(TrackerEvent::PeerExpired {
                info_hash,
                peer_id: peer.peer_id,
            });
        }
    }

    /// Aggregate swarm gauges for the `/stats` endpoint.
    #[must_use]
    pub fn get_metrics(&self) -> AggregateMetrics {
        self.registry.metrics()
    }

    /// Per-protocol request counters for the `/stats` endpoint.
    pub async fn get_request_metrics(&self) -> tokio::sync::RwLockReadGuard<'_, statistics::Metrics> {
        self.stats_repository.get_metrics().await
    }

    /// Sends a statistics event to the keeper, when statistics are enabled.
    pub async fn send_stats_event(&self, event: statistics::Event) -> Option<Result<(), SendError<statistics::Event>>> {
        match &self.stats_event_sender {
            None => None,
            Some(stats_event_sender) => stats_event_sender.send_event(event).await,
        }
    }

    /// Resolves the token when one is given. Private trackers require one;
    /// on public trackers a token only enables credit accounting.
    async fn authenticate(&self, token: Option<&AuthToken>) -> Result<Option<UserProfile>, Error> {
        match token {
            Some(token) => Ok(Some(self.authenticator.authenticate(token).await?)),
            None if self.private => Err(Error::Authentication {
                source: auth::Error::MissingToken {
                    location: Location::caller(),
                },
            }),
            None => Ok(None),
        }
    }

    /// Checks that the torrent may be announced or scraped by this caller.
    async fn check_torrent(&self, info_hash: &InfoHash, profile: Option<&UserProfile>) -> Result<(), Error> {
        let torrent = match self.torrent_repository.lookup(info_hash).await {
            Ok(torrent) => torrent,
            Err(source) => {
                if self.private {
                    return Err(Error::TorrentCatalogUnavailable {
                        source: reef_tracker_located_error::Located(source).into(),
                    });
                }
                // Public trackers degrade: peer coordination keeps working
                // without the catalog.
                warn!(%info_hash, %source, "torrent catalog unavailable, skipping torrent check");
                return Ok(());
            }
        };

        match torrent {
            None => {
                if self.private {
                    return Err(Error::TorrentNotFound {
                        info_hash: *info_hash,
                        location: Location::caller(),
                    });
                }
                Ok(())
            }
            Some(torrent) => {
                if !torrent.is_active {
                    return Err(Error::TorrentNotActive {
                        info_hash: *info_hash,
                        location: Location::caller(),
                    });
                }
                if torrent.is_private && profile.is_none() {
                    return Err(Error::Authentication {
                        source: auth::Error::MissingToken {
                            location: Location::caller(),
                        },
                    });
                }
                Ok(())
            }
        }
    }

    fn apply_diff_side_effects(&self, info_hash: &InfoHash, diff: &PeerDiff) {
        if let Some(evicted) = &diff.evicted {
            self.credit_engine.close_session_for_peer(info_hash, &evicted.peer_id);
            self.observability.emit(TrackerEvent::PeerEvicted {
                info_hash: *info_hash,
                peer_id: evicted.peer_id,
            });
        }
    }
}

/// Whether any other peer in the swarm could have received uploaded bytes.
/// `stats` include the requester itself unless it just stopped.
fn swarm_has_receivers(peer: &Peer, stats: &SwarmMetadata) -> bool {
    if peer.event == reef_tracker_primitives::announce_event::AnnounceEvent::Stopped {
        stats.leechers > 0
    } else if peer.is_seeder() {
        stats.leechers > 0
    } else {
        stats.leechers > 1
    }
}

/// The tracker ignores the IP a peer claims when it arrives over a loopback
/// connection and an external IP is configured, so local clients are
/// announced with a reachable address.
#[must_use]
fn assign_ip_address_to_peer(remote_client_ip: &IpAddr, tracker_external_ip: Option<IpAddr>) -> IpAddr {
    if let Some(host_ip) = tracker_external_ip.filter(|_| remote_client_ip.is_loopback()) {
        host_ip
    } else {
        *remote_client_ip
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Arc;

    use reef_tracker_configuration::Configuration;

    use super::statistics;
    use super::Tracker;
    use crate::core::repositories::in_memory::{self, RepositoryBundle};

    pub struct TestTracker {
        pub tracker: Arc<Tracker>,
        pub repositories: RepositoryBundle,
    }

    pub fn public_tracker() -> TestTracker {
        tracker_with(&Configuration::default(), in_memory::public_repositories())
    }

    pub fn private_tracker() -> TestTracker {
        let configuration = Configuration {
            core: reef_tracker_configuration::Core {
                private: true,
                ..reef_tracker_configuration::Core::default()
            },
            ..Configuration::default()
        };
        tracker_with(&configuration, in_memory::private_repositories())
    }

    pub fn tracker_with(configuration: &Configuration, repositories: RepositoryBundle) -> TestTracker {
        let tracker = Tracker::new(
            configuration,
            repositories.user_repository.clone(),
            repositories.torrent_repository.clone(),
            repositories.ledger.clone(),
            repositories.observability.clone(),
            None,
            statistics::Repo::new(),
        );

        TestTracker {
            tracker: Arc::new(tracker),
            repositories,
        }
    }
}
