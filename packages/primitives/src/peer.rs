//! Peer struct used by the tracker core.
//!
//! A sample peer:
//!
//! ```rust
//! use std::net::{IpAddr, Ipv4Addr, SocketAddr};
//! use reef_tracker_primitives::announce_event::AnnounceEvent;
//! use reef_tracker_primitives::peer;
//! use reef_tracker_primitives::{DurationSinceUnixEpoch, NumberOfBytes, Transport};
//!
//! let peer = peer::Peer {
//!     peer_id: peer::Id(*b"-qB00000000000000000"),
//!     peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080),
//!     updated: DurationSinceUnixEpoch::new(1_669_397_478_934, 0),
//!     uploaded: NumberOfBytes(0),
//!     downloaded: NumberOfBytes(0),
//!     left: NumberOfBytes(0),
//!     event: AnnounceEvent::Started,
//!     transport: Transport::Http,
//!     key: None,
//! };
//! ```
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

use crate::announce_event::AnnounceEvent;
use crate::{DurationSinceUnixEpoch, IPVersion, NumberOfBytes, Transport};

pub const PEER_ID_BYTES_LEN: usize = 20;

/// Peer struct used by the tracker core to keep announced peers.
///
/// Most attributes come straight from the announce request; `updated` is
/// stamped by the tracker and drives TTL expiry and LRU eviction.
#[derive(Debug, Clone, Serialize, Copy, PartialEq, Eq, Hash)]
pub struct Peer {
    /// ID self-assigned by the downloader peer.
    pub peer_id: Id,
    /// The IP and port this peer is listening on.
    pub peer_addr: SocketAddr,
    /// The last time the tracker received an announce request from this peer.
    #[serde(serialize_with = "ser_unix_time_value")]
    pub updated: DurationSinceUnixEpoch,
    /// The total amount of bytes uploaded by this peer so far.
    pub uploaded: NumberOfBytes,
    /// The total amount of bytes downloaded by this peer so far.
    pub downloaded: NumberOfBytes,
    /// The number of bytes this peer still has to download.
    pub left: NumberOfBytes,
    /// The event reported with the last announce.
    pub event: AnnounceEvent,
    /// The transport the peer announced over.
    pub transport: Transport,
    /// Optional per-client secret echoed on re-announce, folded to 32 bits.
    /// Used to reject announces that hijack a known peer id from another
    /// endpoint.
    pub key: Option<Key>,
}

/// Serializes a `DurationSinceUnixEpoch` as a Unix timestamp in milliseconds.
///
/// # Errors
///
/// Will return `serde::Serializer::Error` if unable to serialize the value.
pub fn ser_unix_time_value<S: serde::Serializer>(unix_time_value: &DurationSinceUnixEpoch, ser: S) -> Result<S::Ok, S::Error> {
    #[allow(clippy::cast_possible_truncation)]
    ser.serialize_u64(unix_time_value.as_millis() as u64)
}

impl Peer {
    /// A peer that has the whole torrent. A `stopped` peer does not count
    /// even if it reported `left == 0` on its way out.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left.0 <= 0 && self.event != AnnounceEvent::Stopped
    }

    /// Whether the peer may appear in announce responses handed to other
    /// peers. Paused peers stay in the swarm but are never advertised.
    #[must_use]
    pub fn is_advertised(&self) -> bool {
        self.event != AnnounceEvent::Paused && self.event != AnnounceEvent::Stopped
    }

    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.peer_addr.ip()
    }

    pub fn change_ip(&mut self, new_ip: &IpAddr) {
        self.peer_addr = SocketAddr::new(*new_ip, self.peer_addr.port());
    }

    /// The IP version used by the peer: IPv4 or IPv6.
    #[must_use]
    pub fn ip_version(&self) -> IPVersion {
        if self.peer_addr.is_ipv4() {
            return IPVersion::IPv4;
        }
        IPVersion::IPv6
    }
}

impl Ord for Peer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.peer_id.cmp(&other.peer_id)
    }
}

impl PartialOrd for Peer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A 20-byte peer ID, self-chosen by the client and typically prefixed with
/// a vendor tag like `-qB4520-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub [u8; 20]);

impl Id {
    /// The lowercase hex representation of the ID bytes.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        let mut chars = [0u8; 40];
        binascii::bin2hex(&self.0, &mut chars).expect("output buffer has the exact size");
        std::str::from_utf8(&chars)
            .expect("hex digits are valid UTF-8")
            .to_string()
    }

    /// Parses a peer id from its 40-character hex representation, which is
    /// how WebTorrent clients send it.
    ///
    /// # Errors
    ///
    /// Will return an `IdConversionError` if the input is not 40 hex digits.
    pub fn from_hex_string(hex: &str) -> Result<Self, IdConversionError> {
        if hex.len() != 40 {
            return Err(IdConversionError::NotHexEncoded {
                location: Location::caller(),
                message: format!("got {} chars, expected 40", hex.len()),
            });
        }

        let mut bytes = [0u8; 20];
        binascii::hex2bin(hex.as_bytes(), &mut bytes).map_err(|_| IdConversionError::NotHexEncoded {
            location: Location::caller(),
            message: format!("invalid hex digits in {hex:?}"),
        })?;

        Ok(Self(bytes))
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.to_hex_string())
    }
}

impl std::str::FromStr for Id {
    type Err = IdConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.as_bytes().to_vec())
    }
}

impl From<[u8; 20]> for Id {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Error returned when trying to convert an invalid peer id from another
/// type, usually because the source does not contain exactly 20 bytes.
#[derive(Error, Debug)]
pub enum IdConversionError {
    #[error("not enough bytes for peer id: {message} {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        message: String,
    },
    #[error("too many bytes for peer id: {message} {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        message: String,
    },
    #[error("peer id is not hex encoded: {message} {location}")]
    NotHexEncoded {
        location: &'static Location<'static>,
        message: String,
    },
}

impl TryFrom<Vec<u8>> for Id {
    type Error = IdConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < PEER_ID_BYTES_LEN {
            return Err(IdConversionError::NotEnoughBytes {
                location: Location::caller(),
                message: format!("got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN),
            });
        }
        if bytes.len() > PEER_ID_BYTES_LEN {
            return Err(IdConversionError::TooManyBytes {
                location: Location::caller(),
                message: format!("got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN),
            });
        }

        let mut data = [0u8; 20];
        data.copy_from_slice(&bytes);
        Ok(Self(data))
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex_string())
    }
}

/// The optional `key` a client sends with its announces, folded into the
/// 32-bit value BEP 15 carries on the wire.
///
/// A client keeps the same key across re-announces, so a known peer id
/// showing up from a new endpoint with a different key is treated as a
/// spoofing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Key(pub u32);

impl Key {
    /// Normalizes an HTTP `key` parameter. Values that read as a decimal
    /// or hex number map to that number so HTTP and UDP announces from the
    /// same client agree; anything else is folded with FNV-1a.
    #[must_use]
    pub fn from_param(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<u32>() {
            return Self(value);
        }
        if let Ok(value) = u32::from_str_radix(raw.trim_start_matches("0x"), 16) {
            return Self(value);
        }
        Self(fnv1a_32(raw.as_bytes()))
    }
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::{Id, Key, Peer};
    use crate::announce_event::AnnounceEvent;
    use crate::{DurationSinceUnixEpoch, NumberOfBytes, Transport};

    /// Builder for test peers.
    #[derive(PartialEq, Debug)]
    pub struct PeerBuilder {
        peer: Peer,
    }

    #[allow(clippy::derivable_impls)]
    impl Default for PeerBuilder {
        fn default() -> Self {
            Self { peer: Peer::default() }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn seeder() -> Self {
            let mut builder = Self::default();
            builder.peer.peer_id = Id(*b"-qB00000000000000001");
            builder.peer.left = NumberOfBytes(0);
            builder.peer.event = AnnounceEvent::Completed;
            builder
        }

        #[must_use]
        pub fn leecher() -> Self {
            let mut builder = Self::default();
            builder.peer.peer_id = Id(*b"-qB00000000000000002");
            builder.peer.left = NumberOfBytes(10);
            builder.peer.event = AnnounceEvent::Started;
            builder
        }

        #[must_use]
        pub fn with_peer_id(mut self, peer_id: &Id) -> Self {
            self.peer.peer_id = *peer_id;
            self
        }

        #[must_use]
        pub fn with_peer_addr(mut self, peer_addr: &SocketAddr) -> Self {
            self.peer.peer_addr = *peer_addr;
            self
        }

        #[must_use]
        pub fn with_event(mut self, event: AnnounceEvent) -> Self {
            self.peer.event = event;
            self
        }

        #[must_use]
        pub fn with_transport(mut self, transport: Transport) -> Self {
            self.peer.transport = transport;
            self
        }

        #[must_use]
        pub fn with_key(mut self, key: Key) -> Self {
            self.peer.key = Some(key);
            self
        }

        #[must_use]
        pub fn with_bytes_pending_to_download(mut self, left: i64) -> Self {
            self.peer.left = NumberOfBytes(left);
            self
        }

        #[must_use]
        pub fn with_bytes_uploaded(mut self, uploaded: i64) -> Self {
            self.peer.uploaded = NumberOfBytes(uploaded);
            self
        }

        #[must_use]
        pub fn last_updated_on(mut self, updated: DurationSinceUnixEpoch) -> Self {
            self.peer.updated = updated;
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }

    impl Default for Peer {
        fn default() -> Self {
            Self {
                peer_id: Id(*b"-qB00000000000000000"),
                peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080),
                updated: DurationSinceUnixEpoch::new(1_669_397_478_934, 0),
                uploaded: NumberOfBytes(0),
                downloaded: NumberOfBytes(0),
                left: NumberOfBytes(0),
                event: AnnounceEvent::Started,
                transport: Transport::Http,
                key: None,
            }
        }
    }
}
