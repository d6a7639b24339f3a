//! The UDP tracker, following
//! [BEP 15: UDP Tracker Protocol for `BitTorrent`](https://www.bittorrent.org/beps/bep_0015.html).
//!
//! UDP is connectionless, so the protocol starts with a `connect` exchange:
//! the server hands out a 64-bit connection id bound to the client's
//! `(ip, port)` and valid for two minutes, and every later `announce` or
//! `scrape` must echo it. Requests with an unknown or expired connection id
//! get an `error` packet echoing their transaction id.
//!
//! The wire codec lives in [`protocol`]; the connection id scheme in
//! [`connection_cookie`].
pub mod connection_cookie;
pub mod error;
pub mod handlers;
pub mod peer_builder;
pub mod protocol;
pub mod server;

use std::net::SocketAddr;

/// Maximum number of bytes the tracker accepts or sends in one datagram.
pub const MAX_PACKET_SIZE: usize = 1496;

/// A raw datagram as received from the socket.
#[derive(Debug)]
pub struct UdpRequest {
    pub payload: Vec<u8>,
    pub from: SocketAddr,
}
