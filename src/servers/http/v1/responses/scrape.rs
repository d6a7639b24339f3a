//! `Scrape` response for the HTTP tracker.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reef_tracker_bencode::{ben_int, ben_map};

use crate::core::ScrapeData;

/// The bencoded `scrape` response.
///
/// ```rust
/// use reef_tracker::core::ScrapeData;
/// use reef_tracker::servers::http::v1::responses::scrape::Bencoded;
/// use reef_tracker_primitives::info_hash::InfoHash;
/// use reef_tracker_primitives::swarm_metadata::SwarmMetadata;
///
/// let info_hash = InfoHash([0x69; 20]);
/// let mut scrape_data = ScrapeData::empty();
/// scrape_data.add_file(
///     &info_hash,
///     SwarmMetadata {
///         seeders: 1,
///         leechers: 3,
///         completed: 2,
///     },
/// );
///
/// let response = Bencoded::from(scrape_data);
///
/// let expected_bytes = b"d5:filesd20:iiiiiiiiiiiiiiiiiiiid8:completei1e10:downloadedi2e10:incompletei3eeee";
///
/// assert_eq!(
///     String::from_utf8(response.body()).unwrap(),
///     String::from_utf8(expected_bytes.to_vec()).unwrap()
/// );
/// ```
#[derive(Debug, PartialEq, Default)]
pub struct Bencoded {
    scrape_data: ScrapeData,
}

impl Bencoded {
    /// Returns the bencoded representation of the scrape response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut files = ben_map!();
        let files_mut = files.dict_mut().expect("the dictionary was just built");

        for (info_hash, metadata) in &self.scrape_data.files {
            files_mut.insert(
                info_hash.bytes().to_vec(),
                ben_map! {
                    "complete" => ben_int!(i64::from(metadata.complete())),
                    "downloaded" => ben_int!(i64::from(metadata.downloaded())),
                    "incomplete" => ben_int!(i64::from(metadata.incomplete()))
                },
            );
        }

        (ben_map! {
            "files" => files
        })
        .encode()
    }
}

impl From<ScrapeData> for Bencoded {
    fn from(scrape_data: ScrapeData) -> Self {
        Self { scrape_data }
    }
}

impl IntoResponse for Bencoded {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}
