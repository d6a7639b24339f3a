//! The `Query` struct used to parse and store the URL query parameters.
//!
//! The standard string-typed query parsers cannot be used because
//! `info_hash` and `peer_id` carry percent-encoded binary data; values are
//! therefore kept in their raw percent-encoded form and decoded by the
//! request parsers that know each parameter's type.
use std::panic::Location;
use std::str::FromStr;

use multimap::MultiMap;
use thiserror::Error;

type ParamName = String;
type ParamValue = String;

/// A parsed URL query component. Parameters may repeat (`info_hash` does in
/// scrape requests).
#[derive(Debug, Default)]
pub struct Query {
    params: MultiMap<ParamName, ParamValue>,
}

impl Query {
    /// The first value of a parameter.
    ///
    /// ```rust
    /// use reef_tracker::servers::http::v1::query::Query;
    ///
    /// let query = "param1=value1&param2=value2".parse::<Query>().unwrap();
    ///
    /// assert_eq!(query.get_param("param1").unwrap(), "value1");
    /// assert_eq!(query.get_param("param2").unwrap(), "value2");
    /// ```
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    /// All the values of a parameter.
    ///
    /// ```rust
    /// use reef_tracker::servers::http::v1::query::Query;
    ///
    /// let query = "param1=value1&param1=value2".parse::<Query>().unwrap();
    ///
    /// assert_eq!(
    ///     query.get_param_vec("param1"),
    ///     Some(vec!["value1".to_string(), "value2".to_string()])
    /// );
    /// ```
    #[must_use]
    pub fn get_param_vec(&self, name: &str) -> Option<Vec<String>> {
        self.params.get_vec(name).cloned()
    }
}

/// This error can be returned when parsing a [`Query`] from a string.
#[derive(Error, Debug)]
pub enum ParseQueryError {
    /// Invalid URL query param, for example `name=value=value` with an
    /// unescaped `=` in the value.
    #[error("invalid param {raw_param} in {location}")]
    InvalidParam {
        location: &'static Location<'static>,
        raw_param: String,
    },
}

impl FromStr for Query {
    type Err = ParseQueryError;

    fn from_str(raw_query: &str) -> Result<Self, Self::Err> {
        let mut params: MultiMap<ParamName, ParamValue> = MultiMap::new();

        for raw_param in raw_query.trim().trim_start_matches('?').split('&') {
            let pair: Vec<&str> = raw_param.split('=').collect();

            if pair.len() != 2 {
                return Err(ParseQueryError::InvalidParam {
                    location: Location::caller(),
                    raw_param: raw_param.to_owned(),
                });
            }

            params.insert(pair[0].to_owned(), pair[1].to_owned());
        }

        Ok(Self { params })
    }
}

impl From<Vec<(&str, &str)>> for Query {
    fn from(raw_params: Vec<(&str, &str)>) -> Self {
        let mut params: MultiMap<ParamName, ParamValue> = MultiMap::new();

        for (name, value) in raw_params {
            params.insert(name.to_owned(), value.to_owned());
        }

        Self { params }
    }
}

#[cfg(test)]
mod tests {

    mod url_query {
        use crate::servers::http::v1::query::Query;

        #[test]
        fn should_parse_the_query_params_from_an_url_query_string() {
            let raw_query = "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0&peer_id=-qB00000000000000001&port=17548";

            let query = raw_query.parse::<Query>().unwrap();

            assert_eq!(
                query.get_param("info_hash").unwrap(),
                "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0"
            );
            assert_eq!(query.get_param("peer_id").unwrap(), "-qB00000000000000001");
            assert_eq!(query.get_param("port").unwrap(), "17548");
        }

        #[test]
        fn should_keep_all_the_values_of_a_repeated_param() {
            let query = "info_hash=a&info_hash=b".parse::<Query>().unwrap();

            assert_eq!(
                query.get_param_vec("info_hash"),
                Some(vec!["a".to_string(), "b".to_string()])
            );
        }

        #[test]
        fn get_param_should_return_the_first_value_of_a_repeated_param() {
            let query = "info_hash=a&info_hash=b".parse::<Query>().unwrap();

            assert_eq!(query.get_param("info_hash").unwrap(), "a");
        }

        #[test]
        fn should_reject_a_param_with_an_unescaped_equals_sign() {
            assert!("param1=value1=value2".parse::<Query>().is_err());
        }

        #[test]
        fn should_ignore_a_leading_question_mark() {
            let query = "?param1=value1".parse::<Query>().unwrap();

            assert_eq!(query.get_param("param1").unwrap(), "value1");
        }

        #[test]
        fn should_return_none_for_a_missing_param() {
            let query = "param1=value1".parse::<Query>().unwrap();

            assert!(query.get_param("missing").is_none());
        }
    }
}
