//! Delivery layers: one server per transport, all speaking to the same
//! [`core::Tracker`](crate::core::Tracker).
pub mod http;
pub mod udp;
pub mod ws;
