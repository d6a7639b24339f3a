//! Connection id scheme for the UDP tracker.
//!
//! BEP 15 requires the server to hand out a 64-bit connection id on
//! `connect` and to accept it for two minutes. Storing issued ids would make
//! the server stateful per client, so the id is a cookie instead:
//!
//! ```text
//! connection id = issue timestamp (4 bytes) | digest (4 bytes)
//! digest        = hash(remote ip, remote port, issue timestamp, instance seed)
//! ```
//!
//! The server can verify any id it ever issued by recomputing the digest
//! from the sender address and the embedded timestamp, and the timestamp
//! bounds the validity window exactly. The seed is random per process, so
//! ids do not survive a restart and cannot be forged without it.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::panic::Location;
use std::time::Duration;

use reef_tracker_clock::clock::Time;
use thiserror::Error;

use crate::CurrentClock;

lazy_static::lazy_static! {
    /// Random per-process seed for the cookie digest.
    static ref COOKIE_SEED: u64 = rand::random();
}

/// The connection id issued to and echoed by UDP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(pub i64);

/// The echoed connection id did not pass verification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("connection id was not issued to this client, {location}")]
    InvalidConnectionId { location: &'static Location<'static> },

    #[error("connection id has expired, {location}")]
    ExpiredConnectionId { location: &'static Location<'static> },
}

/// Issues a connection id for the client behind `remote_address`.
#[must_use]
pub fn make(remote_address: &SocketAddr) -> ConnectionId {
    #[allow(clippy::cast_possible_truncation)]
    let issued_at = CurrentClock::now().as_secs() as u32;

    let mut id = [0u8; 8];
    id[..4].copy_from_slice(&issued_at.to_be_bytes());
    id[4..].copy_from_slice(&digest(remote_address, issued_at).to_be_bytes());

    ConnectionId(i64::from_be_bytes(id))
}

/// Checks a connection id echoed by the client behind `remote_address`.
///
/// # Errors
///
/// Will return an [`enum@Error`] if the id was not issued to this client or
/// was issued more than `lifetime` ago.
pub fn check(remote_address: &SocketAddr, connection_id: ConnectionId, lifetime: Duration) -> Result<(), Error> {
    let id = connection_id.0.to_be_bytes();

    let issued_at = u32::from_be_bytes(id[..4].try_into().expect("id has 4 timestamp bytes"));
    let echoed_digest = u32::from_be_bytes(id[4..].try_into().expect("id has 4 digest bytes"));

    if echoed_digest != digest(remote_address, issued_at) {
        return Err(Error::InvalidConnectionId {
            location: Location::caller(),
        });
    }

    let now = CurrentClock::now();
    let issued_at = Duration::from_secs(u64::from(issued_at));

    if now < issued_at || now.saturating_sub(issued_at) > lifetime {
        return Err(Error::ExpiredConnectionId {
            location: Location::caller(),
        });
    }

    Ok(())
}

fn digest(remote_address: &SocketAddr, issued_at: u32) -> u32 {
    let mut hasher = DefaultHasher::new();

    remote_address.hash(&mut hasher);
    issued_at.hash(&mut hasher);
    COOKIE_SEED.hash(&mut hasher);

    #[allow(clippy::cast_possible_truncation)]
    let digest = hasher.finish() as u32;
    digest
}
