//! The credit-accounting engine.
//!
//! The tracker's correctness floor is peer coordination; credit accounting
//! rides on top of it. For every accepted announce the engine diffs the
//! cumulative `uploaded`/`downloaded` counters against the per
//! `(user, torrent)` session, applies the user-class multipliers and emits
//! transactions through the [`Ledger`](crate::core::repositories::Ledger)
//! port. A ledger outage never fails an announce.
pub mod engine;
pub mod session;

pub use engine::CreditEngine;
pub use session::{Session, SessionKey};
