//! `Scrape` request for the HTTP tracker.
use std::panic::Location;

use reef_tracker_located_error::{Located, LocatedError};
use reef_tracker_primitives::info_hash::{ConversionError, InfoHash};
use thiserror::Error;

use crate::core::auth::AuthToken;
use crate::servers::http::percent_encoding::percent_decode_info_hash;
use crate::servers::http::v1::query::Query;
use crate::servers::http::v1::responses;

const INFO_HASH: &str = "info_hash";
const AUTH_TOKEN: &str = "auth_token";

/// The `Scrape` request. The `info_hash` param can be repeated to scrape
/// multiple torrents in one request.
#[derive(Debug, PartialEq)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
    pub auth_token: Option<AuthToken>,
}

/// Errors that can occur when parsing the `Scrape` request.
#[derive(Error, Debug)]
pub enum ParseScrapeQueryError {
    #[error("missing query params for scrape request in {location}")]
    MissingParams { location: &'static Location<'static> },

    #[error("missing param {param_name} in {location}")]
    MissingParam {
        location: &'static Location<'static>,
        param_name: String,
    },

    #[error("invalid param value {param_value} for {param_name} in {source}")]
    InvalidInfoHashParam {
        param_name: String,
        param_value: String,
        source: LocatedError<'static, ConversionError>,
    },
}

impl From<ParseScrapeQueryError> for responses::error::Error {
    fn from(err: ParseScrapeQueryError) -> Self {
        responses::error::Error {
            failure_reason: format!("Cannot parse query params for scrape request: {err}"),
        }
    }
}

impl TryFrom<Query> for Scrape {
    type Error = ParseScrapeQueryError;

    fn try_from(query: Query) -> Result<Self, Self::Error> {
        Ok(Self {
            info_hashes: extract_info_hashes(&query)?,
            auth_token: query.get_param(AUTH_TOKEN).map(AuthToken::from),
        })
    }
}

fn extract_info_hashes(query: &Query) -> Result<Vec<InfoHash>, ParseScrapeQueryError> {
    match query.get_param_vec(INFO_HASH) {
        Some(raw_params) => {
            let mut info_hashes = vec![];

            for raw_param in raw_params {
                let info_hash =
                    percent_decode_info_hash(&raw_param).map_err(|err| ParseScrapeQueryError::InvalidInfoHashParam {
                        param_name: INFO_HASH.to_owned(),
                        param_value: raw_param.clone(),
                        source: Located(err).into(),
                    })?;

                info_hashes.push(info_hash);
            }

            Ok(info_hashes)
        }
        None => Err(ParseScrapeQueryError::MissingParam {
            location: Location::caller(),
            param_name: INFO_HASH.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {

    mod scrape_request {
        use reef_tracker_primitives::info_hash::InfoHash;

        use crate::servers::http::v1::query::Query;
        use crate::servers::http::v1::requests::scrape::Scrape;

        #[test]
        fn should_be_instantiated_from_the_url_query_with_only_one_infohash() {
            let query = Query::from(vec![("info_hash", "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0")]);

            let scrape_request = Scrape::try_from(query).unwrap();

            assert_eq!(
                scrape_request,
                Scrape {
                    info_hashes: vec!["3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap()],
                    auth_token: None,
                }
            );
        }

        #[test]
        fn should_collect_every_repeated_infohash_param() {
            let query = Query::from(vec![
                ("info_hash", "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0"),
                ("info_hash", "%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA%AA"),
            ]);

            let scrape_request = Scrape::try_from(query).unwrap();

            assert_eq!(scrape_request.info_hashes.len(), 2);
            assert_eq!(scrape_request.info_hashes[1], InfoHash([0xAA; 20]));
        }

        #[test]
        fn should_fail_when_the_info_hash_param_is_missing() {
            let query = Query::from(vec![("auth_token", "YZSl4lMZupRuOpSRC3krIKR5BPB14nrJ")]);

            assert!(Scrape::try_from(query).is_err());
        }

        #[test]
        fn should_fail_when_an_info_hash_param_is_invalid() {
            let query = Query::from(vec![("info_hash", "invalid")]);

            assert!(Scrape::try_from(query).is_err());
        }
    }
}
