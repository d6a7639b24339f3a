//! Decoder errors.
use thiserror::Error;

/// Error returned when a byte slice cannot be decoded as bencode.
///
/// The `pos` fields are byte offsets into the input, which makes protocol
/// failure messages actionable when a client sends garbage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BencodeParseError {
    #[error("input ended before the value was complete at byte {pos}")]
    Truncated { pos: usize },

    #[error("unexpected byte {byte:#04x} at byte {pos}")]
    UnexpectedByte { pos: usize, byte: u8 },

    #[error("integer is not in canonical form at byte {pos}")]
    NonCanonicalInteger { pos: usize },

    #[error("integer overflows 64 bits at byte {pos}")]
    IntegerOverflow { pos: usize },

    #[error("byte string length is not in canonical form at byte {pos}")]
    NonCanonicalLength { pos: usize },

    #[error("dictionary key at byte {pos} is not a byte string")]
    InvalidDictKey { pos: usize },

    #[error("duplicate dictionary key at byte {pos}")]
    DuplicateDictKey { pos: usize },

    #[error("value nesting exceeds {max} levels at byte {pos}")]
    TooDeep { pos: usize, max: usize },

    #[error("{remaining} trailing bytes after the root value")]
    TrailingBytes { remaining: usize },
}
