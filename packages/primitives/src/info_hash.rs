//! `BitTorrent` Info Hash v1.
use std::panic::Location;

use thiserror::Error;

/// `BitTorrent` Info Hash v1: the 20-byte SHA-1 of a torrent's info
/// dictionary.
///
/// There are two common representations: the raw byte array and the
/// 40-character hex string.
///
/// ```rust
/// use std::str::FromStr;
/// use reef_tracker_primitives::info_hash::InfoHash;
///
/// let info_hash: InfoHash = [255u8; 20].into();
///
/// assert_eq!(
///     info_hash,
///     InfoHash::from_str("ffffffffffffffffffffffffffffffffffffffff").unwrap()
/// );
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Default, PartialOrd, Ord)]
pub struct InfoHash(pub [u8; 20]);

pub const INFO_HASH_BYTES_LEN: usize = 20;

impl InfoHash {
    /// Returns the internal byte array.
    #[must_use]
    pub fn bytes(&self) -> [u8; 20] {
        self.0
    }

    /// Returns the lowercase hex representation.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chars = [0u8; 40];
        binascii::bin2hex(&self.0, &mut chars).expect("output buffer has the exact size");
        write!(f, "{}", std::str::from_utf8(&chars).expect("hex digits are valid UTF-8"))
    }
}

impl std::str::FromStr for InfoHash {
    type Err = binascii::ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 {
            return Err(binascii::ConvertError::InvalidInputLength);
        }
        let mut info_hash = Self::default();
        binascii::hex2bin(s.as_bytes(), &mut info_hash.0)?;
        Ok(info_hash)
    }
}

impl From<[u8; 20]> for InfoHash {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Errors that can occur when converting from a `Vec<u8>` to an [`InfoHash`].
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Not enough bytes for an infohash. An infohash is 20 bytes.
    #[error("not enough bytes for infohash: {message} {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        message: String,
    },
    /// Too many bytes for an infohash. An infohash is 20 bytes.
    #[error("too many bytes for infohash: {message} {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        message: String,
    },
}

impl TryFrom<Vec<u8>> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < INFO_HASH_BYTES_LEN {
            return Err(ConversionError::NotEnoughBytes {
                location: Location::caller(),
                message: format!("got {} bytes, expected {}", bytes.len(), INFO_HASH_BYTES_LEN),
            });
        }
        if bytes.len() > INFO_HASH_BYTES_LEN {
            return Err(ConversionError::TooManyBytes {
                location: Location::caller(),
                message: format!("got {} bytes, expected {}", bytes.len(), INFO_HASH_BYTES_LEN),
            });
        }

        let mut data = [0u8; 20];
        data.copy_from_slice(&bytes);
        Ok(Self(data))
    }
}

impl serde::ser::Serialize for InfoHash {
    fn serialize<S: serde::ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::de::Deserialize<'de> for InfoHash {
    fn deserialize<D: serde::de::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        des.deserialize_str(InfoHashVisitor)
    }
}

struct InfoHashVisitor;

impl serde::de::Visitor<'_> for InfoHashVisitor {
    type Value = InfoHash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "a 40 character long hexadecimal string")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(|_| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(v), &"a 40 character long hexadecimal string")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::InfoHash;

    #[test]
    fn it_should_be_parsed_from_a_40_char_hex_string() {
        let info_hash = InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap();

        assert_eq!(
            info_hash.bytes(),
            [
                0x3b, 0x24, 0x55, 0x04, 0xcf, 0x5f, 0x11, 0xbb, 0xdb, 0xe1, 0x20, 0x1c, 0xea, 0x6a, 0x6b, 0xf4, 0x5a, 0xee,
                0x1b, 0xc0
            ]
        );
    }

    #[test]
    fn it_should_reject_strings_with_the_wrong_length() {
        assert!(InfoHash::from_str("deadbeef").is_err());
    }

    #[test]
    fn it_should_display_as_lowercase_hex() {
        let info_hash = InfoHash([0xAA; 20]);

        assert_eq!(info_hash.to_string(), "aa".repeat(20));
    }

    #[test]
    fn it_should_be_converted_from_a_20_byte_vector() {
        let info_hash = InfoHash::try_from(vec![0x69u8; 20]).unwrap();

        assert_eq!(info_hash, InfoHash([0x69; 20]));
    }

    #[test]
    fn conversion_should_fail_for_vectors_of_the_wrong_length() {
        assert!(InfoHash::try_from(vec![0u8; 19]).is_err());
        assert!(InfoHash::try_from(vec![0u8; 21]).is_err());
    }

    #[test]
    fn it_should_serialize_as_a_hex_string() {
        let info_hash = InfoHash([0x69; 20]);

        assert_eq!(
            serde_json::to_string(&info_hash).unwrap(),
            format!("\"{}\"", "69".repeat(20))
        );
    }

    #[test]
    fn it_should_deserialize_from_a_hex_string() {
        let info_hash: InfoHash = serde_json::from_str(&format!("\"{}\"", "69".repeat(20))).unwrap();

        assert_eq!(info_hash, InfoHash([0x69; 20]));
    }
}
