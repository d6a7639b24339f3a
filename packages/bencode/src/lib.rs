//! Library for decoding and building bencoded data.
//!
//! Decoding:
//!
//! ```rust
//! use reef_tracker_bencode::BencodeRef;
//!
//! let data = b"d12:lucky_numberi7ee";
//! let bencode = BencodeRef::decode(data).unwrap();
//!
//! assert_eq!(7, bencode.dict().unwrap().lookup(b"lucky_number").unwrap().int().unwrap());
//! ```
//!
//! Building and encoding:
//!
//! ```rust
//! use reef_tracker_bencode::{ben_bytes, ben_int, ben_map};
//!
//! let message = (ben_map! {
//!     "lucky_number" => ben_int!(7),
//!     "lucky_string" => ben_bytes!("7")
//! })
//! .encode();
//!
//! assert_eq!(&b"d12:lucky_numberi7e12:lucky_string1:7e"[..], &message[..]);
//! ```
//!
//! The encoder always emits dictionary keys sorted by their raw bytes, so the
//! output for a given value is deterministic. The decoder is strict: duplicate
//! dictionary keys, integers with leading zeros, negative zero and trailing
//! bytes after the root value are all rejected.
pub mod error;
mod mutable;
mod reference;

pub use crate::error::BencodeParseError;
pub use crate::mutable::{BencodeMut, IntoBencodeBytes};
pub use crate::reference::{BencodeRef, DictRef};

/// Maximum nesting depth accepted by the decoder. Deeper inputs are treated
/// as malformed rather than risking stack exhaustion.
pub const MAX_DECODE_DEPTH: usize = 32;

/// Builds a [`BencodeMut`] dictionary from `key => value` pairs.
#[macro_export]
macro_rules! ben_map {
    () => { $crate::BencodeMut::new_dict() };
    ($($key:expr => $val:expr),+) => {{
        let mut bencode_dict = $crate::BencodeMut::new_dict();

        {
            let dict = bencode_dict.dict_mut().unwrap();
            $(
                dict.insert($crate::IntoBencodeBytes::into_bencode_bytes($key), $val);
            )+
        }

        bencode_dict
    }};
}

/// Builds a [`BencodeMut`] list from a sequence of values.
#[macro_export]
macro_rules! ben_list {
    () => { $crate::BencodeMut::new_list() };
    ($($val:expr),+) => {{
        let mut bencode_list = $crate::BencodeMut::new_list();

        {
            let list = bencode_list.list_mut().unwrap();
            $(
                list.push($val);
            )+
        }

        bencode_list
    }};
}

/// Builds a [`BencodeMut`] byte string.
#[macro_export]
macro_rules! ben_bytes {
    ($val:expr) => {
        $crate::BencodeMut::new_bytes($crate::IntoBencodeBytes::into_bencode_bytes($val))
    };
}

/// Builds a [`BencodeMut`] integer.
#[macro_export]
macro_rules! ben_int {
    ($val:expr) => {
        $crate::BencodeMut::new_int($val)
    };
}
