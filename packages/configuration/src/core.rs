//! Core tracker configuration section.
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Core tracker settings, independent of any delivery layer.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Core {
    /// Announce policy configuration.
    #[serde(default)]
    pub announce_policy: AnnouncePolicy,

    /// Swarm registry configuration.
    #[serde(default)]
    pub swarm_policy: SwarmPolicy,

    /// Credit engine configuration.
    #[serde(default)]
    pub credit_policy: CreditPolicy,

    /// When `true`, clients must present a valid `auth_token` and only
    /// registered torrents can be announced.
    #[serde(default = "Core::default_private")]
    pub private: bool,

    /// When `true`, the tracker trusts `X-Forwarded-For` (rightmost hop) and
    /// explicit `ip` parameters instead of the socket address.
    #[serde(default = "Core::default_on_reverse_proxy")]
    pub on_reverse_proxy: bool,

    /// The external IP of the host. It replaces loopback client addresses in
    /// peer lists so local test clients are reachable by remote peers.
    #[serde(default = "Core::default_external_ip")]
    pub external_ip: Option<std::net::IpAddr>,

    /// Interval in seconds the expirer runs on.
    #[serde(default = "Core::default_inactive_peer_cleanup_interval")]
    pub inactive_peer_cleanup_interval: u64,

    /// Whether the tracker collects usage statistics.
    #[serde(default = "Core::default_tracker_usage_statistics")]
    pub tracker_usage_statistics: bool,
}

impl Default for Core {
    fn default() -> Self {
        Self {
            announce_policy: AnnouncePolicy::default(),
            swarm_policy: SwarmPolicy::default(),
            credit_policy: CreditPolicy::default(),
            private: Self::default_private(),
            on_reverse_proxy: Self::default_on_reverse_proxy(),
            external_ip: Self::default_external_ip(),
            inactive_peer_cleanup_interval: Self::default_inactive_peer_cleanup_interval(),
            tracker_usage_statistics: Self::default_tracker_usage_statistics(),
        }
    }
}

impl Core {
    fn default_private() -> bool {
        false
    }

    fn default_on_reverse_proxy() -> bool {
        false
    }

    fn default_external_ip() -> Option<std::net::IpAddr> {
        None
    }

    fn default_inactive_peer_cleanup_interval() -> u64 {
        60
    }

    fn default_tracker_usage_statistics() -> bool {
        true
    }
}

/// The intervals handed to clients in announce responses.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Constructor)]
pub struct AnnouncePolicy {
    /// Interval in seconds that clients should wait between regular announce
    /// requests.
    #[serde(default = "AnnouncePolicy::default_interval")]
    pub interval: u32,

    /// Minimum announce interval. Clients must not reannounce more
    /// frequently than this.
    #[serde(default = "AnnouncePolicy::default_interval_min")]
    pub interval_min: u32,
}

impl Default for AnnouncePolicy {
    fn default() -> Self {
        Self::new(Self::default_interval(), Self::default_interval_min())
    }
}

impl AnnouncePolicy {
    fn default_interval() -> u32 {
        600
    }

    fn default_interval_min() -> u32 {
        300
    }
}

/// Limits and lifetimes of the in-memory swarm registry.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Constructor)]
pub struct SwarmPolicy {
    /// Maximum number of peers kept per swarm. Inserting into a full swarm
    /// evicts the least recently announced peer.
    #[serde(default = "SwarmPolicy::default_max_peers_per_swarm")]
    pub max_peers_per_swarm: usize,

    /// Maximum number of swarms. New torrents beyond this are refused with a
    /// `tracker full` failure.
    #[serde(default = "SwarmPolicy::default_max_swarms")]
    pub max_swarms: usize,

    /// Seconds a peer may stay silent before the expirer evicts it. Twice
    /// the default announce interval.
    #[serde(default = "SwarmPolicy::default_peer_ttl_secs")]
    pub peer_ttl_secs: u32,

    /// Seconds an empty swarm is kept around before it is dropped.
    #[serde(default = "SwarmPolicy::default_empty_swarm_grace_secs")]
    pub empty_swarm_grace_secs: u32,
}

impl Default for SwarmPolicy {
    fn default() -> Self {
        Self::new(
            Self::default_max_peers_per_swarm(),
            Self::default_max_swarms(),
            Self::default_peer_ttl_secs(),
            Self::default_empty_swarm_grace_secs(),
        )
    }
}

impl SwarmPolicy {
    fn default_max_peers_per_swarm() -> usize {
        1000
    }

    fn default_max_swarms() -> usize {
        1_000_000
    }

    fn default_peer_ttl_secs() -> u32 {
        1200
    }

    fn default_empty_swarm_grace_secs() -> u32 {
        600
    }
}

/// Rules the credit engine applies when turning announce counters into
/// ledger transactions.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy, Constructor)]
pub struct CreditPolicy {
    /// Seconds of announce silence after which the next announce opens a new
    /// session (its counters become the new baseline, contributing no delta).
    #[serde(default = "CreditPolicy::default_session_reset_threshold_secs")]
    pub session_reset_threshold_secs: u64,

    /// Reward rate applied to raw uploaded bytes.
    #[serde(default = "CreditPolicy::default_upload_reward_rate")]
    pub upload_reward_rate: f64,

    /// Ceiling used by the cheating heuristics: an upload delta above
    /// `link_capacity_bytes_per_sec * elapsed` is flagged.
    #[serde(default = "CreditPolicy::default_link_capacity_bytes_per_sec")]
    pub link_capacity_bytes_per_sec: u64,

    /// How many times a failed ledger write is retried before the
    /// transaction is dropped.
    #[serde(default = "CreditPolicy::default_ledger_write_retries")]
    pub ledger_write_retries: u32,

    /// Deadline in seconds for a single ledger write attempt.
    #[serde(default = "CreditPolicy::default_ledger_write_timeout_secs")]
    pub ledger_write_timeout_secs: u64,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self::new(
            Self::default_session_reset_threshold_secs(),
            Self::default_upload_reward_rate(),
            Self::default_link_capacity_bytes_per_sec(),
            Self::default_ledger_write_retries(),
            Self::default_ledger_write_timeout_secs(),
        )
    }
}

impl CreditPolicy {
    fn default_session_reset_threshold_secs() -> u64 {
        1800
    }

    fn default_upload_reward_rate() -> f64 {
        1.0
    }

    fn default_link_capacity_bytes_per_sec() -> u64 {
        // 10 Gbit/s. Generous on purpose: the flag should only fire on
        // counters no residential link could have produced.
        1_250_000_000
    }

    fn default_ledger_write_retries() -> u32 {
        3
    }

    fn default_ledger_write_timeout_secs() -> u64 {
        5
    }
}
