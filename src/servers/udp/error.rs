//! Errors of the UDP tracker, all rendered as `error` packets.
use reef_tracker_located_error::LocatedError;
use thiserror::Error;

use crate::servers::udp::protocol::ParseRequestError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("bad request: {source}")]
    BadRequest {
        source: LocatedError<'static, ParseRequestError>,
    },

    #[error("{source}")]
    ConnectionCookie {
        #[from]
        source: crate::servers::udp::connection_cookie::Error,
    },

    #[error("tracker error: {source}")]
    Tracker {
        #[from]
        source: crate::core::error::Error,
    },
}
