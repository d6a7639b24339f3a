//! `Error` response for the HTTP tracker.
//!
//! From [BEP 03. The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html):
//!
//! _"Tracker responses are bencoded dictionaries. If a tracker response has
//! a key failure reason, then that maps to a human readable string which
//! explains why the query failed, and no other keys are required."_
//!
//! > **NOTICE**: error responses are bencoded and always have a `200 OK`
//! > status code. Clients treat non-200 announce responses as a dead
//! > tracker.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reef_tracker_bencode::{ben_bytes, ben_map};

/// `Error` response for the HTTP tracker.
#[derive(Debug, PartialEq)]
pub struct Error {
    /// Human readable string which explains why the request failed.
    pub failure_reason: String,
}

impl Error {
    /// Returns the bencoded representation of the error.
    ///
    /// ```rust
    /// use reef_tracker::servers::http::v1::responses::error::Error;
    ///
    /// let err = Error {
    ///    failure_reason: "error message".to_owned(),
    /// };
    ///
    /// assert_eq!(err.body(), b"d14:failure reason13:error messagee");
    /// ```
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        (ben_map! {
            "failure reason" => ben_bytes!(self.failure_reason.as_str())
        })
        .encode()
    }
}

impl From<crate::core::error::Error> for Error {
    fn from(err: crate::core::error::Error) -> Self {
        Error {
            failure_reason: format!("Tracker error: {err}"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

#[cfg(test)]
mod tests {

    use super::Error;

    #[test]
    fn http_tracker_errors_can_be_bencoded() {
        let err = Error {
            failure_reason: "error message".to_owned(),
        };

        assert_eq!(err.body(), b"d14:failure reason13:error messagee");
    }
}
