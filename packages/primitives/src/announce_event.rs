//! Announce events reported by peers.
use serde::{Deserialize, Serialize};

/// The event a peer reports with an announce request.
///
/// `Started`, `Stopped` and `Completed` come from
/// [BEP 3](https://www.bittorrent.org/beps/bep_0003.html). `Paused` is the
/// WebTorrent extension for peers that keep their slot but should not be
/// advertised. `None` is the regular-interval update.
#[derive(Hash, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AnnounceEvent {
    /// The peer has started downloading the torrent.
    Started,
    /// The peer has ceased downloading the torrent.
    Stopped,
    /// The peer has completed downloading the torrent.
    Completed,
    /// The peer keeps participating but must not be handed out to others.
    Paused,
    /// One of the announcements done at regular intervals.
    None,
}

impl AnnounceEvent {
    /// Maps the numeric event of a BEP 15 announce packet. Unknown values
    /// fall back to the plain interval update, which is what most trackers
    /// do in practice.
    #[inline]
    #[must_use]
    pub fn from_i32(i: i32) -> Self {
        match i {
            1 => Self::Completed,
            2 => Self::Started,
            3 => Self::Stopped,
            4 => Self::Paused,
            _ => Self::None,
        }
    }

    #[inline]
    #[must_use]
    pub fn to_i32(&self) -> i32 {
        match self {
            AnnounceEvent::None => 0,
            AnnounceEvent::Completed => 1,
            AnnounceEvent::Started => 2,
            AnnounceEvent::Stopped => 3,
            AnnounceEvent::Paused => 4,
        }
    }
}
