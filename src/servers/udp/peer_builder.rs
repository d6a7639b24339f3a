//! Builds the domain peer from an announce packet.
use std::net::{IpAddr, SocketAddr};

use reef_tracker_clock::clock::Time;
use reef_tracker_primitives::peer::{self, Peer};
use reef_tracker_primitives::{NumberOfBytes, Transport};

use crate::servers::udp::protocol::AnnounceRequest;
use crate::CurrentClock;

/// It builds a peer from the announce packet and the datagram sender
/// address.
///
/// The stated IPv4 address in the packet is only honored when the tracker
/// is configured behind a trusted proxy; otherwise the sender address wins,
/// which is also what BEP 15 recommends.
#[must_use]
pub fn from_request(request: &AnnounceRequest, remote_addr: &SocketAddr, on_reverse_proxy: bool) -> Peer {
    let peer_ip = match request.ip_address {
        Some(stated_ip) if on_reverse_proxy => IpAddr::V4(stated_ip),
        _ => remote_addr.ip(),
    };

    Peer {
        peer_id: request.peer_id,
        peer_addr: SocketAddr::new(peer_ip, request.port),
        updated: CurrentClock::now(),
        uploaded: NumberOfBytes(request.uploaded),
        downloaded: NumberOfBytes(request.downloaded),
        left: NumberOfBytes(request.left),
        event: request.event,
        transport: Transport::Udp,
        key: Some(peer::Key(request.key)),
    }
}
