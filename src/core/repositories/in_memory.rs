//! In-memory reference implementations of the repository ports.
//!
//! The standalone binary wires these in when no external stores are
//! configured, and the tests use them as controllable doubles.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use reef_tracker_primitives::info_hash::InfoHash;

use super::{
    CreditTransaction, Ledger, Observability, RepositoryError, TorrentInfo, TorrentRepository, TrackerEvent, UserProfile,
    UserRepository,
};
use crate::core::auth::AuthToken;

/// A user store backed by a hash map.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<AuthToken, UserProfile>>,
}

impl InMemoryUserRepository {
    pub fn insert(&self, token: AuthToken, profile: UserProfile) {
        self.users
            .write()
            .expect("user table lock is never poisoned")
            .insert(token, profile);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn resolve_token(&self, token: &AuthToken) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self
            .users
            .read()
            .expect("user table lock is never poisoned")
            .get(token)
            .cloned())
    }
}

/// A torrent catalog backed by a hash map. When `open` is set, unknown
/// torrents resolve as public active entries, which is how a non-private
/// tracker behaves.
pub struct InMemoryTorrentRepository {
    torrents: RwLock<HashMap<InfoHash, TorrentInfo>>,
    open: bool,
}

impl InMemoryTorrentRepository {
    #[must_use]
    pub fn new(open: bool) -> Self {
        Self {
            torrents: RwLock::new(HashMap::new()),
            open,
        }
    }

    pub fn insert(&self, info_hash: InfoHash, torrent: TorrentInfo) {
        self.torrents
            .write()
            .expect("torrent table lock is never poisoned")
            .insert(info_hash, torrent);
    }
}

#[async_trait]
impl TorrentRepository for InMemoryTorrentRepository {
    async fn lookup(&self, info_hash: &InfoHash) -> Result<Option<TorrentInfo>, RepositoryError> {
        let known = self
            .torrents
            .read()
            .expect("torrent table lock is never poisoned")
            .get(info_hash)
            .copied();

        if known.is_none() && self.open {
            return Ok(Some(TorrentInfo {
                is_active: true,
                is_private: false,
                owner_id: 0,
            }));
        }

        Ok(known)
    }
}

/// A ledger that appends transactions to a vector. Tests inspect the vector;
/// the standalone binary uses it as a sink.
#[derive(Default)]
pub struct InMemoryLedger {
    transactions: Mutex<Vec<CreditTransaction>>,
    /// Number of write calls that should fail with a transient error before
    /// writes start succeeding. Drives the retry tests.
    failures_left: Mutex<u32>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn transactions(&self) -> Vec<CreditTransaction> {
        self.transactions
            .lock()
            .expect("transaction log lock is never poisoned")
            .clone()
    }

    pub fn fail_next_writes(&self, failures: u32) {
        *self.failures_left.lock().expect("failure counter lock is never poisoned") = failures;
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn write_transaction(&self, transaction: &CreditTransaction) -> Result<(), RepositoryError> {
        {
            let mut failures_left = self.failures_left.lock().expect("failure counter lock is never poisoned");
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(RepositoryError::Transient {
                    location: std::panic::Location::caller(),
                    message: "ledger write failed".to_string(),
                });
            }
        }

        self.transactions
            .lock()
            .expect("transaction log lock is never poisoned")
            .push(transaction.clone());

        Ok(())
    }
}

/// An observability sink that records the emitted events.
#[derive(Default)]
pub struct RecordingObservability {
    events: Mutex<Vec<TrackerEvent>>,
}

impl RecordingObservability {
    #[must_use]
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.lock().expect("event log lock is never poisoned").clone()
    }
}

impl Observability for RecordingObservability {
    fn emit(&self, event: TrackerEvent) {
        self.events.lock().expect("event log lock is never poisoned").push(event);
    }
}

/// Repository bundle with public-tracker behavior: every torrent is known
/// and active, no token required.
#[must_use]
pub fn public_repositories() -> RepositoryBundle {
    RepositoryBundle {
        user_repository: Arc::new(InMemoryUserRepository::default()),
        torrent_repository: Arc::new(InMemoryTorrentRepository::new(true)),
        ledger: Arc::new(InMemoryLedger::default()),
        observability: Arc::new(RecordingObservability::default()),
    }
}

/// Repository bundle with private-tracker behavior: only registered torrents
/// and tokens resolve.
#[must_use]
pub fn private_repositories() -> RepositoryBundle {
    RepositoryBundle {
        user_repository: Arc::new(InMemoryUserRepository::default()),
        torrent_repository: Arc::new(InMemoryTorrentRepository::new(false)),
        ledger: Arc::new(InMemoryLedger::default()),
        observability: Arc::new(RecordingObservability::default()),
    }
}

/// The concrete in-memory stores, kept as concrete types so tests and the
/// binary wiring can reach their inspection helpers.
pub struct RepositoryBundle {
    pub user_repository: Arc<InMemoryUserRepository>,
    pub torrent_repository: Arc<InMemoryTorrentRepository>,
    pub ledger: Arc<InMemoryLedger>,
    pub observability: Arc<RecordingObservability>,
}
