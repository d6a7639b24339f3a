//! Axum [`extractor`](axum::extract) for the
//! [`Announce`](crate::servers::http::v1::requests::announce::Announce)
//! request.
//!
//! It parses the raw query string (the standard extractors cannot be used
//! because `info_hash` and `peer_id` are percent-encoded binary) and returns
//! a bencoded [`Error`](crate::servers::http::v1::responses::error) response
//! when the query parameters are missing or invalid.
use std::panic::Location;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::servers::http::v1::query::Query;
use crate::servers::http::v1::requests::announce::{Announce, ParseAnnounceQueryError};
use crate::servers::http::v1::responses;

/// Extractor for the [`Announce`] request.
pub struct ExtractRequest(pub Announce);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_announce_from(parts.uri.query()) {
            Ok(announce_request) => Ok(ExtractRequest(announce_request)),
            Err(error) => Err(error.into_response()),
        }
    }
}

fn extract_announce_from(maybe_raw_query: Option<&str>) -> Result<Announce, responses::error::Error> {
    let Some(raw_query) = maybe_raw_query else {
        return Err(responses::error::Error::from(ParseAnnounceQueryError::MissingParams {
            location: Location::caller(),
        }));
    };

    let query = raw_query.parse::<Query>().map_err(responses::error::Error::from)?;

    let announce_request = Announce::try_from(query).map_err(responses::error::Error::from)?;

    Ok(announce_request)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use reef_tracker_primitives::info_hash::InfoHash;
    use reef_tracker_primitives::peer;

    use super::extract_announce_from;
    use crate::servers::http::v1::requests::announce::Event;
    use crate::servers::http::v1::responses::error::Error;

    fn assert_error_response(error: &Error, error_message: &str) {
        assert!(
            error.failure_reason.contains(error_message),
            "Error response does not contain message: '{error_message}'. Error: {error:?}"
        );
    }

    #[test]
    fn it_should_extract_the_announce_request_from_the_url_query_params() {
        let raw_query = "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0&peer_id=-qB00000000000000001&port=17548&downloaded=0&uploaded=0&left=0&event=completed&compact=1";

        let announce = extract_announce_from(Some(raw_query)).unwrap();

        assert_eq!(
            announce.info_hash,
            InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap()
        );
        assert_eq!(announce.peer_id, peer::Id(*b"-qB00000000000000001"));
        assert_eq!(announce.port, 17548);
        assert_eq!(announce.event, Some(Event::Completed));
    }

    #[test]
    fn it_should_reject_a_request_without_query_params() {
        let response = extract_announce_from(None).unwrap_err();

        assert_error_response(
            &response,
            "Cannot parse query params for announce request: missing query params for announce request",
        );
    }

    #[test]
    fn it_should_reject_a_request_with_a_query_that_cannot_be_parsed() {
        let response = extract_announce_from(Some("param1=value1=value2")).unwrap_err();

        assert_error_response(&response, "Cannot parse query params");
    }

    #[test]
    fn it_should_reject_a_request_with_a_query_that_cannot_be_parsed_into_an_announce_request() {
        let response = extract_announce_from(Some("param1=value1")).unwrap_err();

        assert_error_response(&response, "Cannot parse query params for announce request");
    }
}
