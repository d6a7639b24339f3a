//! Time related functions and types.
//!
//! It's usually a good idea to control where the time comes from in an
//! application so that it can be mocked for testing and controlled in
//! production so we get the intended behavior without relying on the
//! underlying system time.
//!
//! Clocks use the type `DurationSinceUnixEpoch`, which is a
//! `std::time::Duration` since the Unix Epoch (timestamp).
//!
//! Production code uses the [`clock::Working`] clock; tests use the
//! [`clock::Stopped`] clock, which only advances when told to. Each crate
//! declares its own `CurrentClock` alias switching between the two with
//! `#[cfg(test)]`.
pub mod clock;
pub mod conv;

/// Working version, for production.
#[cfg(not(test))]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Stopped;
