//! Reef Tracker: a `BitTorrent` tracker with HTTP, UDP and WebSocket
//! delivery layers and an auxiliary credit-accounting engine.
//!
//! The tracker keeps all swarm state in memory. The [`core`] module holds the
//! domain layer: the swarm registry, the authenticator, the credit engine and
//! the statistics keeper. The [`servers`] module holds one delivery layer per
//! transport, all translating their wire formats to and from the same
//! normalized requests. The [`bootstrap`] module wires everything together
//! into running jobs.
//!
//! ```text
//! Delivery layer       Domain layer
//!
//!     HTTP tracker |
//!      UDP tracker |>  Core tracker
//! WebSocket tracker|
//! ```
//!
//! Users, torrents and the credit ledger live behind the repository ports in
//! [`core::repositories`]; the tracker itself persists nothing and rebuilds
//! its state from client announces after a restart.
pub mod app;
pub mod bootstrap;
pub mod core;
pub mod servers;
pub mod shared;

/// Working clock in production, stopped clock under test so expiry windows
/// and cookie lifetimes can be driven by the tests.
#[cfg(not(test))]
pub type CurrentClock = reef_tracker_clock::clock::Working;

#[cfg(test)]
pub type CurrentClock = reef_tracker_clock::clock::Stopped;
