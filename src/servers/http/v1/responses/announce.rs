//! `Announce` response for the HTTP tracker.
//!
//! Data structures and logic to build the `announce` response in both
//! formats: the dictionary model from
//! [BEP 03](https://www.bittorrent.org/beps/bep_0003.html) and the compact
//! form from [BEP 23](https://www.bittorrent.org/beps/bep_0023.html) with
//! the `peers6` extension from
//! [BEP 07](https://www.bittorrent.org/beps/bep_0007.html).
use std::io::Write;
use std::net::IpAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reef_tracker_bencode::{ben_bytes, ben_int, ben_list, ben_map, BencodeMut};
use reef_tracker_configuration::AnnouncePolicy;
use reef_tracker_primitives::swarm_metadata::SwarmMetadata;

use crate::core::AnnounceData;

/// Non-compact `announce` response: the peer list is a list of dictionaries
/// with `peer id`, `ip` and `port`.
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr};
/// use reef_tracker::servers::http::v1::responses::announce::{NonCompact, NormalPeer};
///
/// let peer = NormalPeer {
///     peer_id: *b"-qB00000000000000001",
///     ip: IpAddr::V4(Ipv4Addr::new(0x69, 0x69, 0x69, 0x69)), // 105.105.105.105
///     port: 0x7070,                                          // 28784
/// };
/// ```
#[derive(Debug, PartialEq)]
pub struct NonCompact {
    pub policy: AnnouncePolicy,
    pub stats: SwarmMetadata,
    pub peers: Vec<NormalPeer>,
    /// Opaque tracker id echoed from the request, when the client sent one.
    pub tracker_id: Option<String>,
}

/// Peer information in the [`NonCompact`] response.
#[derive(Debug, PartialEq)]
pub struct NormalPeer {
    pub peer_id: [u8; 20],
    pub ip: IpAddr,
    pub port: u16,
}

impl NormalPeer {
    #[must_use]
    pub fn ben_map(&self) -> BencodeMut {
        ben_map! {
            "peer id" => ben_bytes!(self.peer_id.to_vec()),
            "ip" => ben_bytes!(self.ip.to_string()),
            "port" => ben_int!(i64::from(self.port))
        }
    }
}

impl NonCompact {
    /// Returns the bencoded body of the non-compact response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut peers_list = ben_list!();
        let peers_list_mut = peers_list.list_mut().expect("the list was just built");
        for peer in &self.peers {
            peers_list_mut.push(peer.ben_map());
        }

        let mut response = ben_map! {
            "complete" => ben_int!(i64::from(self.stats.complete())),
            "incomplete" => ben_int!(i64::from(self.stats.incomplete())),
            "interval" => ben_int!(i64::from(self.policy.interval)),
            "min interval" => ben_int!(i64::from(self.policy.interval_min)),
            "peers" => peers_list
        };

        if let Some(tracker_id) = &self.tracker_id {
            response
                .dict_mut()
                .expect("the dictionary was just built")
                .insert(b"tracker id".to_vec(), ben_bytes!(tracker_id.as_str()));
        }

        response.encode()
    }
}

impl IntoResponse for NonCompact {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl From<AnnounceData> for NonCompact {
    fn from(data: AnnounceData) -> Self {
        let peers: Vec<NormalPeer> = data
            .peers
            .iter()
            .map(|peer| NormalPeer {
                peer_id: peer.peer_id.0,
                ip: peer.peer_addr.ip(),
                port: peer.peer_addr.port(),
            })
            .collect();

        Self {
            policy: data.policy,
            stats: data.stats,
            peers,
            tracker_id: None,
        }
    }
}

/// Compact `announce` response.
///
/// _"To reduce the size of tracker responses and to reduce memory and
/// computational requirements in trackers, trackers may return peers as a
/// packed string rather than as a bencoded list."_
///
/// IPv4 peers go into `peers` as concatenated 6-byte records (4-byte
/// address + 2-byte big-endian port), IPv6 peers into `peers6` as 18-byte
/// records.
#[derive(Debug, PartialEq)]
pub struct Compact {
    pub policy: AnnouncePolicy,
    pub stats: SwarmMetadata,
    pub peers: Vec<CompactPeer>,
    /// Opaque tracker id echoed from the request, when the client sent one.
    pub tracker_id: Option<String>,
}

/// Compact peer: just the endpoint, no peer id.
#[derive(Debug, PartialEq)]
pub struct CompactPeer {
    pub ip: IpAddr,
    pub port: u16,
}

impl CompactPeer {
    /// The packed on-wire bytes: 6 for IPv4, 18 for IPv6.
    ///
    /// # Errors
    ///
    /// Will return `Err` if internally interrupted.
    pub fn bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut bytes: Vec<u8> = Vec::new();
        match self.ip {
            IpAddr::V4(ip) => {
                bytes.write_all(&u32::from(ip).to_be_bytes())?;
            }
            IpAddr::V6(ip) => {
                bytes.write_all(&u128::from(ip).to_be_bytes())?;
            }
        }
        bytes.write_all(&self.port.to_be_bytes())?;
        Ok(bytes)
    }
}

impl Compact {
    /// Returns the bencoded compact response as a byte vector.
    ///
    /// # Errors
    ///
    /// Will return `Err` if internally interrupted.
    pub fn body(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut response = ben_map! {
            "complete" => ben_int!(i64::from(self.stats.complete())),
            "incomplete" => ben_int!(i64::from(self.stats.incomplete())),
            "interval" => ben_int!(i64::from(self.policy.interval)),
            "min interval" => ben_int!(i64::from(self.policy.interval_min)),
            "peers" => ben_bytes!(self.peers_v4_bytes()?),
            "peers6" => ben_bytes!(self.peers_v6_bytes()?)
        };

        if let Some(tracker_id) = &self.tracker_id {
            response
                .dict_mut()
                .expect("the dictionary was just built")
                .insert(b"tracker id".to_vec(), ben_bytes!(tracker_id.as_str()));
        }

        Ok(response.encode())
    }

    fn peers_v4_bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut bytes: Vec<u8> = Vec::new();
        for compact_peer in &self.peers {
            if compact_peer.ip.is_ipv4() {
                bytes.write_all(&compact_peer.bytes()?)?;
            }
        }
        Ok(bytes)
    }

    fn peers_v6_bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut bytes: Vec<u8> = Vec::new();
        for compact_peer in &self.peers {
            if compact_peer.ip.is_ipv6() {
                bytes.write_all(&compact_peer.bytes()?)?;
            }
        }
        Ok(bytes)
    }
}

impl IntoResponse for Compact {
    fn into_response(self) -> Response {
        match self.body() {
            Ok(bytes) => (StatusCode::OK, bytes).into_response(),
            Err(err) => super::error::Error {
                failure_reason: format!("cannot serialize compact response: {err}"),
            }
            .into_response(),
        }
    }
}

impl From<AnnounceData> for Compact {
    fn from(data: AnnounceData) -> Self {
        let peers: Vec<CompactPeer> = data
            .peers
            .iter()
            .map(|peer| CompactPeer {
                ip: peer.peer_addr.ip(),
                port: peer.peer_addr.port(),
            })
            .collect();

        Self {
            policy: data.policy,
            stats: data.stats,
            peers,
            tracker_id: None,
        }
    }
}
