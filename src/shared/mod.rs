//! Modules shared by the core and the delivery layers.
pub mod bit_torrent;
