//! Live WebSocket sessions, keyed by peer id.
//!
//! The swarm registry stores WebSocket peers like any others; this registry
//! owns the outbound half of their connections so offers and answers can be
//! routed to them. A peer that loses its socket simply disappears from here
//! and stops receiving relays until it reconnects.
use std::collections::HashMap;
use std::sync::RwLock;

use reef_tracker_primitives::peer;
use tokio::sync::mpsc;
use tracing::debug;

/// The outbound message channel of one connected client.
pub type SessionSender = mpsc::UnboundedSender<String>;

/// The registry of live WebSocket sessions.
#[derive(Default)]
pub struct Registry {
    sessions: RwLock<HashMap<peer::Id, SessionSender>>,
}

impl Registry {
    /// Registers the session of `peer_id`, replacing a previous one (last
    /// connection wins, matching the swarm's reconnect semantics).
    pub fn register(&self, peer_id: peer::Id, sender: SessionSender) {
        self.sessions
            .write()
            .expect("session table lock is never poisoned")
            .insert(peer_id, sender);
    }

    pub fn unregister(&self, peer_id: &peer::Id) {
        self.sessions
            .write()
            .expect("session table lock is never poisoned")
            .remove(peer_id);
    }

    /// Sends a serialized message to a peer. Returns `false` when the peer
    /// has no live session (it may have announced over another transport or
    /// just disconnected).
    pub fn send_to(&self, peer_id: &peer::Id, message: String) -> bool {
        let sessions = self.sessions.read().expect("session table lock is never poisoned");

        match sessions.get(peer_id) {
            Some(sender) => sender.send(message).is_ok(),
            None => {
                debug!(%peer_id, "no live websocket session for relay target");
                false
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().expect("session table lock is never poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
