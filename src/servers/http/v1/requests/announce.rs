//! `Announce` request for the HTTP tracker.
//!
//! Data structures and logic for parsing the `announce` request.
use std::fmt;
use std::net::IpAddr;
use std::panic::Location;
use std::str::FromStr;

use reef_tracker_located_error::{Located, LocatedError};
use reef_tracker_primitives::info_hash::{ConversionError, InfoHash};
use reef_tracker_primitives::peer::{self, IdConversionError};
use thiserror::Error;

use crate::core::auth::AuthToken;
use crate::servers::http::percent_encoding::{percent_decode_info_hash, percent_decode_peer_id};
use crate::servers::http::v1::query::{ParseQueryError, Query};
use crate::servers::http::v1::responses;

/// The number of bytes `downloaded`, `uploaded` or `left`.
pub type NumberOfBytes = i64;

// Query param names
const INFO_HASH: &str = "info_hash";
const PEER_ID: &str = "peer_id";
const PORT: &str = "port";
const DOWNLOADED: &str = "downloaded";
const UPLOADED: &str = "uploaded";
const LEFT: &str = "left";
const EVENT: &str = "event";
const COMPACT: &str = "compact";
const NUMWANT: &str = "numwant";
const TRACKERID: &str = "trackerid";
const KEY: &str = "key";
const AUTH_TOKEN: &str = "auth_token";
const IP: &str = "ip";

/// The `Announce` request. Fields use the domain types after parsing the
/// query params of the request.
///
/// ```rust
/// use reef_tracker::servers::http::v1::requests::announce::{Announce, Compact, Event};
/// use reef_tracker_primitives::info_hash::InfoHash;
/// use reef_tracker_primitives::peer;
///
/// let request = Announce {
///     // Mandatory params
///     info_hash: "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap(),
///     peer_id: "-qB00000000000000001".parse::<peer::Id>().unwrap(),
///     port: 17548,
///     // Optional params
///     downloaded: Some(1),
///     uploaded: Some(2),
///     left: Some(3),
///     event: Some(Event::Started),
///     compact: Some(Compact::Accepted),
///     numwant: Some(50),
///     trackerid: None,
///     key: None,
///     auth_token: None,
///     ip: None,
/// };
/// ```
#[derive(Debug, PartialEq)]
pub struct Announce {
    // Mandatory params
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub port: u16,

    // Optional params
    pub downloaded: Option<NumberOfBytes>,
    pub uploaded: Option<NumberOfBytes>,
    pub left: Option<NumberOfBytes>,
    pub event: Option<Event>,
    pub compact: Option<Compact>,
    pub numwant: Option<usize>,
    /// Opaque tracker id from a previous response, echoed back verbatim.
    pub trackerid: Option<String>,
    /// Opaque per-client secret echoed on re-announce.
    pub key: Option<peer::Key>,
    /// Authentication token issued by the user store.
    pub auth_token: Option<AuthToken>,
    /// The IP the client claims to announce from. Only honored when the
    /// tracker runs behind a trusted reverse proxy.
    pub ip: Option<IpAddr>,
}

/// Errors that can occur when parsing the `Announce` request.
///
/// The `info_hash` and `peer_id` query params are special because they
/// contain percent-encoded binary data of exactly 20 bytes.
#[derive(Error, Debug)]
pub enum ParseAnnounceQueryError {
    #[error("missing query params for announce request in {location}")]
    MissingParams { location: &'static Location<'static> },

    #[error("missing param {param_name} in {location}")]
    MissingParam {
        location: &'static Location<'static>,
        param_name: String,
    },

    #[error("invalid param value {param_value} for {param_name} in {location}")]
    InvalidParam {
        param_name: String,
        param_value: String,
        location: &'static Location<'static>,
    },

    #[error("param value overflow {param_value} for {param_name} in {location}")]
    NumberOfBytesOverflow {
        param_name: String,
        param_value: String,
        location: &'static Location<'static>,
    },

    #[error("invalid param value {param_value} for {param_name} in {source}")]
    InvalidInfoHashParam {
        param_name: String,
        param_value: String,
        source: LocatedError<'static, ConversionError>,
    },

    #[error("invalid param value {param_value} for {param_name} in {source}")]
    InvalidPeerIdParam {
        param_name: String,
        param_value: String,
        source: LocatedError<'static, IdConversionError>,
    },
}

/// The event that the peer is reporting: `started`, `completed`, `stopped`
/// or `paused`. An absent or empty event is one of the announcements done at
/// regular intervals.
#[derive(PartialEq, Eq, Debug)]
pub enum Event {
    Started,
    Stopped,
    Completed,
    Paused,
}

impl FromStr for Event {
    type Err = ParseAnnounceQueryError;

    fn from_str(raw_param: &str) -> Result<Self, Self::Err> {
        match raw_param {
            "started" => Ok(Self::Started),
            "stopped" => Ok(Self::Stopped),
            "completed" => Ok(Self::Completed),
            "paused" => Ok(Self::Paused),
            _ => Err(ParseAnnounceQueryError::InvalidParam {
                param_name: EVENT.to_owned(),
                param_value: raw_param.to_owned(),
                location: Location::caller(),
            }),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Started => write!(f, "started"),
            Event::Stopped => write!(f, "stopped"),
            Event::Completed => write!(f, "completed"),
            Event::Paused => write!(f, "paused"),
        }
    }
}

/// Whether the `announce` response should be in compact mode or not.
///
/// Refer to [BEP 23. Tracker Returns Compact Peer Lists](https://www.bittorrent.org/beps/bep_0023.html).
#[derive(PartialEq, Eq, Debug)]
pub enum Compact {
    Accepted = 1,
    NotAccepted = 0,
}

impl FromStr for Compact {
    type Err = ParseAnnounceQueryError;

    fn from_str(raw_param: &str) -> Result<Self, Self::Err> {
        match raw_param {
            "1" => Ok(Self::Accepted),
            "0" => Ok(Self::NotAccepted),
            _ => Err(ParseAnnounceQueryError::InvalidParam {
                param_name: COMPACT.to_owned(),
                param_value: raw_param.to_owned(),
                location: Location::caller(),
            }),
        }
    }
}

impl From<ParseQueryError> for responses::error::Error {
    fn from(err: ParseQueryError) -> Self {
        responses::error::Error {
            failure_reason: format!("Cannot parse query params: {err}"),
        }
    }
}

impl From<ParseAnnounceQueryError> for responses::error::Error {
    fn from(err: ParseAnnounceQueryError) -> Self {
        responses::error::Error {
            failure_reason: format!("Cannot parse query params for announce request: {err}"),
        }
    }
}

impl TryFrom<Query> for Announce {
    type Error = ParseAnnounceQueryError;

    fn try_from(query: Query) -> Result<Self, Self::Error> {
        Ok(Self {
            info_hash: extract_info_hash(&query)?,
            peer_id: extract_peer_id(&query)?,
            port: extract_port(&query)?,
            downloaded: extract_number_of_bytes(DOWNLOADED, &query)?,
            uploaded: extract_number_of_bytes(UPLOADED, &query)?,
            left: extract_number_of_bytes(LEFT, &query)?,
            event: extract_event(&query)?,
            compact: extract_compact(&query)?,
            numwant: extract_numwant(&query)?,
            trackerid: query.get_param(TRACKERID),
            key: query.get_param(KEY).map(|raw| peer::Key::from_param(&raw)),
            auth_token: query.get_param(AUTH_TOKEN).map(AuthToken::from),
            ip: extract_ip(&query)?,
        })
    }
}

// Mandatory params

fn extract_info_hash(query: &Query) -> Result<InfoHash, ParseAnnounceQueryError> {
    match query.get_param(INFO_HASH) {
        Some(raw_param) => {
            Ok(
                percent_decode_info_hash(&raw_param).map_err(|err| ParseAnnounceQueryError::InvalidInfoHashParam {
                    param_name: INFO_HASH.to_owned(),
                    param_value: raw_param.clone(),
                    source: Located(err).into(),
                })?,
            )
        }
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: INFO_HASH.to_owned(),
        }),
    }
}

fn extract_peer_id(query: &Query) -> Result<peer::Id, ParseAnnounceQueryError> {
    match query.get_param(PEER_ID) {
        Some(raw_param) => Ok(
            percent_decode_peer_id(&raw_param).map_err(|err| ParseAnnounceQueryError::InvalidPeerIdParam {
                param_name: PEER_ID.to_owned(),
                param_value: raw_param.clone(),
                source: Located(err).into(),
            })?,
        ),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: PEER_ID.to_owned(),
        }),
    }
}

fn extract_port(query: &Query) -> Result<u16, ParseAnnounceQueryError> {
    match query.get_param(PORT) {
        Some(raw_param) => Ok(u16::from_str(&raw_param).map_err(|_e| ParseAnnounceQueryError::InvalidParam {
            param_name: PORT.to_owned(),
            param_value: raw_param.clone(),
            location: Location::caller(),
        })?),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: PORT.to_owned(),
        }),
    }
}

// Optional params

fn extract_number_of_bytes(param_name: &str, query: &Query) -> Result<Option<NumberOfBytes>, ParseAnnounceQueryError> {
    match query.get_param(param_name) {
        Some(raw_param) => {
            // Unsigned on the wire; the domain type is i64.
            let number_of_bytes = u64::from_str(&raw_param).map_err(|_e| ParseAnnounceQueryError::InvalidParam {
                param_name: param_name.to_owned(),
                param_value: raw_param.clone(),
                location: Location::caller(),
            })?;

            Ok(Some(i64::try_from(number_of_bytes).map_err(|_e| {
                ParseAnnounceQueryError::NumberOfBytesOverflow {
                    param_name: param_name.to_owned(),
                    param_value: raw_param.clone(),
                    location: Location::caller(),
                }
            })?))
        }
        None => Ok(None),
    }
}

fn extract_event(query: &Query) -> Result<Option<Event>, ParseAnnounceQueryError> {
    match query.get_param(EVENT) {
        Some(raw_param) if raw_param.is_empty() => Ok(None),
        Some(raw_param) => Ok(Some(Event::from_str(&raw_param)?)),
        None => Ok(None),
    }
}

fn extract_compact(query: &Query) -> Result<Option<Compact>, ParseAnnounceQueryError> {
    match query.get_param(COMPACT) {
        Some(raw_param) => Ok(Some(Compact::from_str(&raw_param)?)),
        None => Ok(None),
    }
}

fn extract_numwant(query: &Query) -> Result<Option<usize>, ParseAnnounceQueryError> {
    match query.get_param(NUMWANT) {
        Some(raw_param) => Ok(Some(usize::from_str(&raw_param).map_err(|_e| {
            ParseAnnounceQueryError::InvalidParam {
                param_name: NUMWANT.to_owned(),
                param_value: raw_param.clone(),
                location: Location::caller(),
            }
        })?)),
        None => Ok(None),
    }
}

fn extract_ip(query: &Query) -> Result<Option<IpAddr>, ParseAnnounceQueryError> {
    match query.get_param(IP) {
        Some(raw_param) => Ok(Some(IpAddr::from_str(&raw_param).map_err(|_e| {
            ParseAnnounceQueryError::InvalidParam {
                param_name: IP.to_owned(),
                param_value: raw_param.clone(),
                location: Location::caller(),
            }
        })?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {

    mod announce_request {
        use reef_tracker_primitives::info_hash::InfoHash;
        use reef_tracker_primitives::peer;

        use crate::servers::http::v1::query::Query;
        use crate::servers::http::v1::requests::announce::{Announce, Compact, Event};

        fn mandatory_params() -> Vec<(&'static str, &'static str)> {
            vec![
                ("info_hash", "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0"),
                ("peer_id", "-qB00000000000000001"),
                ("port", "17548"),
            ]
        }

        #[test]
        fn should_be_instantiated_from_the_url_query_with_only_the_mandatory_params() {
            let query = Query::from(mandatory_params());

            let announce_request = Announce::try_from(query).unwrap();

            assert_eq!(
                announce_request,
                Announce {
                    info_hash: "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap(),
                    peer_id: "-qB00000000000000001".parse::<peer::Id>().unwrap(),
                    port: 17548,
                    downloaded: None,
                    uploaded: None,
                    left: None,
                    event: None,
                    compact: None,
                    numwant: None,
                    trackerid: None,
                    key: None,
                    auth_token: None,
                    ip: None,
                }
            );
        }

        #[test]
        fn should_be_instantiated_from_the_url_query_params() {
            let mut params = mandatory_params();
            params.extend([
                ("downloaded", "1"),
                ("uploaded", "2"),
                ("left", "3"),
                ("event", "started"),
                ("compact", "1"),
                ("numwant", "42"),
                ("key", "12345"),
                ("auth_token", "YZSl4lMZupRuOpSRC3krIKR5BPB14nrJ"),
            ]);

            let announce_request = Announce::try_from(Query::from(params)).unwrap();

            assert_eq!(announce_request.downloaded, Some(1));
            assert_eq!(announce_request.uploaded, Some(2));
            assert_eq!(announce_request.left, Some(3));
            assert_eq!(announce_request.event, Some(Event::Started));
            assert_eq!(announce_request.compact, Some(Compact::Accepted));
            assert_eq!(announce_request.numwant, Some(42));
            assert_eq!(announce_request.key, Some(peer::Key(12345)));
            assert!(announce_request.auth_token.is_some());
        }

        #[test]
        fn should_fail_when_the_info_hash_param_is_missing() {
            let query = Query::from(vec![("peer_id", "-qB00000000000000001"), ("port", "17548")]);

            assert!(Announce::try_from(query).is_err());
        }

        #[test]
        fn should_fail_when_the_info_hash_does_not_decode_to_20_bytes() {
            let mut params = mandatory_params();
            params[0] = ("info_hash", "invalid");

            assert!(Announce::try_from(Query::from(params)).is_err());
        }

        #[test]
        fn should_fail_when_a_byte_counter_is_negative() {
            let mut params = mandatory_params();
            params.push(("uploaded", "-1"));

            assert!(Announce::try_from(Query::from(params)).is_err());
        }

        #[test]
        fn should_fail_when_the_event_is_unknown() {
            let mut params = mandatory_params();
            params.push(("event", "restarted"));

            assert!(Announce::try_from(Query::from(params)).is_err());
        }

        #[test]
        fn should_accept_the_paused_event() {
            let mut params = mandatory_params();
            params.push(("event", "paused"));

            let announce_request = Announce::try_from(Query::from(params)).unwrap();

            assert_eq!(announce_request.event, Some(Event::Paused));
        }

        #[test]
        fn an_empty_event_should_mean_a_regular_update() {
            let mut params = mandatory_params();
            params.push(("event", ""));

            let announce_request = Announce::try_from(Query::from(params)).unwrap();

            assert_eq!(announce_request.event, None);
        }

        #[test]
        fn an_opaque_key_param_should_be_folded_to_32_bits() {
            let mut params = mandatory_params();
            params.push(("key", "opaque-client-secret"));

            let announce_request = Announce::try_from(Query::from(params)).unwrap();

            assert_eq!(announce_request.key, Some(peer::Key::from_param("opaque-client-secret")));
        }
    }
}
