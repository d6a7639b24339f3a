//! Credit sessions: the span of successive announces from one user for one
//! torrent over which counter deltas accumulate.
use reef_tracker_primitives::info_hash::InfoHash;
use reef_tracker_primitives::{DurationSinceUnixEpoch, NumberOfBytes};

use crate::core::repositories::UserId;

/// Sessions are per user per torrent. A user seeding the same torrent from
/// two clients shares one session; the monotonicity rules treat the merged
/// counters like any other restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: UserId,
    pub info_hash: InfoHash,
}

/// The running state of one credit session.
///
/// Counters are treated as monotonic within a session: a decrease means the
/// client restarted, which opens a new session with the reported counters as
/// its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub last_uploaded: NumberOfBytes,
    pub last_downloaded: NumberOfBytes,
    pub last_announce: DurationSinceUnixEpoch,
    pub started_at: DurationSinceUnixEpoch,
}

impl Session {
    /// Opens a session at `now` with the reported counters as baseline. The
    /// opening announce never contributes a delta.
    #[must_use]
    pub fn opened_at(now: DurationSinceUnixEpoch, uploaded: NumberOfBytes, downloaded: NumberOfBytes) -> Self {
        Self {
            last_uploaded: uploaded,
            last_downloaded: downloaded,
            last_announce: now,
            started_at: now,
        }
    }
}
