//! The WebSocket (WebTorrent) tracker.
//!
//! Browser peers cannot open TCP or UDP sockets, so WebTorrent clients keep
//! a WebSocket open to the tracker and exchange WebRTC offers and answers
//! through it. The tracker's only job beyond regular announce bookkeeping is
//! to relay those SDP blobs between peers, selected the same way a peer list
//! would be; the payloads themselves are never inspected or modified.
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod server;
