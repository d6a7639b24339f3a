//! Percent decoding for the binary announce parameters.
//!
//! `info_hash` and `peer_id` are raw 20-byte values travelling inside a URL
//! query. Clients percent-escape whatever bytes they must and send the rest
//! literally, so the same infohash can arrive in many spellings; none of
//! them are guaranteed to be valid UTF-8, which rules out the string-typed
//! decoders. These helpers recover the raw bytes and hand them to the
//! domain types, which enforce the exact 20-byte length.
use reef_tracker_primitives::info_hash::{self, InfoHash};
use reef_tracker_primitives::peer;

/// Recovers the raw bytes of a percent-encoded query value. Bytes that were
/// not escaped pass through unchanged.
fn decode_binary_param(raw_param: &str) -> Vec<u8> {
    percent_encoding::percent_decode_str(raw_param).collect()
}

/// Decodes an `info_hash` query parameter into the 20-byte [`InfoHash`].
///
/// ```rust
/// use reef_tracker::servers::http::percent_encoding::percent_decode_info_hash;
/// use reef_tracker_primitives::info_hash::InfoHash;
///
/// let info_hash = percent_decode_info_hash(&"%AA".repeat(20)).unwrap();
///
/// assert_eq!(info_hash, InfoHash([0xAA; 20]));
/// ```
///
/// # Errors
///
/// Will return `Err` if the decoded value is not exactly 20 bytes.
pub fn percent_decode_info_hash(raw_info_hash: &str) -> Result<InfoHash, info_hash::ConversionError> {
    InfoHash::try_from(decode_binary_param(raw_info_hash))
}

/// Decodes a `peer_id` query parameter into the 20-byte [`peer::Id`].
///
/// # Errors
///
/// Will return `Err` if the decoded value is not exactly 20 bytes.
pub fn percent_decode_peer_id(raw_peer_id: &str) -> Result<peer::Id, peer::IdConversionError> {
    peer::Id::try_from(decode_binary_param(raw_peer_id))
}

#[cfg(test)]
mod tests {

    mod decoding_an_info_hash {
        use reef_tracker_primitives::info_hash::InfoHash;

        use crate::servers::http::percent_encoding::percent_decode_info_hash;

        #[test]
        fn every_byte_may_be_escaped() {
            let info_hash = percent_decode_info_hash(&"%AA".repeat(20)).unwrap();

            assert_eq!(info_hash, InfoHash([0xAA; 20]));
        }

        #[test]
        fn printable_bytes_may_arrive_unescaped() {
            // Ten literal ASCII bytes followed by ten escaped ones.
            let raw = format!("0123456789{}", "%00".repeat(10));

            let info_hash = percent_decode_info_hash(&raw).unwrap();

            assert_eq!(&info_hash.bytes()[..10], b"0123456789");
            assert_eq!(&info_hash.bytes()[10..], [0u8; 10]);
        }

        #[test]
        fn a_value_shorter_than_20_bytes_is_rejected() {
            assert!(percent_decode_info_hash(&"%AA".repeat(19)).is_err());
        }

        #[test]
        fn a_value_longer_than_20_bytes_is_rejected() {
            assert!(percent_decode_info_hash(&"%AA".repeat(21)).is_err());
        }

        #[test]
        fn a_hex_string_is_not_an_infohash() {
            // A common client bug: sending the 40-char hex rendering
            // instead of the raw bytes. It decodes to 40 bytes and must be
            // refused, not truncated.
            assert!(percent_decode_info_hash(&"aa".repeat(20)).is_err());
        }
    }

    mod decoding_a_peer_id {
        use reef_tracker_primitives::peer;

        use crate::servers::http::percent_encoding::percent_decode_peer_id;

        #[test]
        fn a_vendor_tagged_id_decodes_to_its_20_bytes() {
            let peer_id = percent_decode_peer_id("%2DRF0017%2D000000000042").unwrap();

            assert_eq!(peer_id, peer::Id(*b"-RF0017-000000000042"));
        }

        #[test]
        fn an_id_with_non_utf8_bytes_is_still_decodable() {
            let raw = "%FF%FE".repeat(10);

            let peer_id = percent_decode_peer_id(&raw).unwrap();

            assert_eq!(peer_id.0[0], 0xFF);
            assert_eq!(peer_id.0[19], 0xFE);
        }

        #[test]
        fn a_value_of_the_wrong_length_is_rejected() {
            assert!(percent_decode_peer_id("-RF0017-too-short").is_err());
        }
    }
}
