//! Ports to the stores the tracker consumes but does not own.
//!
//! Users, torrents and the credit ledger are managed by external
//! applications. The tracker reads and writes them exclusively through the
//! traits in this module, so those systems can be swapped without touching
//! the core. The [`in_memory`] module provides reference implementations used
//! by the standalone binary and the tests.
pub mod in_memory;

use std::panic::Location;

use async_trait::async_trait;
use reef_tracker_located_error::LocatedError;
use reef_tracker_primitives::info_hash::InfoHash;
use reef_tracker_primitives::peer;
use reef_tracker_primitives::{DurationSinceUnixEpoch, NumberOfBytes};
use thiserror::Error;

use crate::core::auth::AuthToken;

/// The class an external application assigned to a user. Classes drive the
/// download multiplier of the credit engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserClass {
    Newbie,
    Member,
    Elite,
}

/// Identity resolved from an `auth_token`, as published by the user store.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub class: UserClass,
    /// Multiplier applied to download deltas when emitting credit
    /// transactions. Published by the user store together with the class:
    /// newbies download at 2x, elites at 0.5x.
    pub download_multiplier: f64,
    pub is_banned: bool,
}

pub type UserId = u64;

/// Torrent metadata relevant to the announce path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorrentInfo {
    pub is_active: bool,
    pub is_private: bool,
    pub owner_id: UserId,
}

/// A credit transaction emitted by the credit engine, written through the
/// [`Ledger`] port.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CreditTransaction {
    pub user_id: UserId,
    pub info_hash: InfoHash,
    pub kind: TransactionKind,
    /// Bytes after the multiplier was applied.
    pub bytes: u64,
    pub multiplier_applied: f64,
    #[serde(serialize_with = "peer::ser_unix_time_value")]
    pub timestamp: DurationSinceUnixEpoch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Upload,
    Download,
}

/// Events pushed to the observability sink: suspicion flags from the credit
/// engine and eviction notices from the swarm registry.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// An upload delta was reported while no other peer in the swarm could
    /// have received the bytes.
    SuspiciousUploadNoReceivers {
        user_id: UserId,
        info_hash: InfoHash,
        delta: NumberOfBytes,
    },
    /// An upload delta exceeded the configured link capacity for the elapsed
    /// time window.
    SuspiciousUploadRate {
        user_id: UserId,
        info_hash: InfoHash,
        delta: NumberOfBytes,
        elapsed: DurationSinceUnixEpoch,
    },
    /// A peer was evicted because its swarm reached the per-swarm cap.
    PeerEvicted { info_hash: InfoHash, peer_id: peer::Id },
    /// A peer was evicted because it went silent past the TTL.
    PeerExpired { info_hash: InfoHash, peer_id: peer::Id },
}

/// Errors surfaced by the repository ports.
///
/// The transient/permanent split drives the retry policy: transient errors
/// are retried, permanent errors drop the operation immediately.
#[derive(Error, Debug, Clone)]
pub enum RepositoryError {
    #[error("backend temporarily unavailable: {message} {location}")]
    Transient {
        location: &'static Location<'static>,
        message: String,
    },
    #[error("backend rejected the operation: {source}")]
    Permanent {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
}

impl RepositoryError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Transient { .. })
    }
}

/// Read access to the user store.
#[async_trait]
pub trait UserRepository: Sync + Send {
    /// Resolves an authentication token to the user it was issued for.
    /// `Ok(None)` means the token is unknown.
    ///
    /// # Errors
    ///
    /// Will return a `RepositoryError` if the user store cannot be reached.
    async fn resolve_token(&self, token: &AuthToken) -> Result<Option<UserProfile>, RepositoryError>;
}

/// Read access to the torrent catalog.
#[async_trait]
pub trait TorrentRepository: Sync + Send {
    /// Looks a torrent up by its infohash. `Ok(None)` means the torrent is
    /// not registered.
    ///
    /// # Errors
    ///
    /// Will return a `RepositoryError` if the torrent store cannot be
    /// reached.
    async fn lookup(&self, info_hash: &InfoHash) -> Result<Option<TorrentInfo>, RepositoryError>;
}

/// Write access to the credit ledger.
#[async_trait]
pub trait Ledger: Sync + Send {
    /// Records one credit transaction.
    ///
    /// # Errors
    ///
    /// Will return a `RepositoryError`; transient errors are retried by the
    /// caller, permanent ones drop the transaction.
    async fn write_transaction(&self, transaction: &CreditTransaction) -> Result<(), RepositoryError>;
}

/// Sink for suspicion flags and eviction notices. Fire-and-forget.
pub trait Observability: Sync + Send {
    fn emit(&self, event: TrackerEvent);
}
