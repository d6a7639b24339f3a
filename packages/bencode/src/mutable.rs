//! Owned bencode values for building responses.
use std::collections::BTreeMap;

/// An owned bencode value under construction.
///
/// Usually built through the [`ben_map!`](crate::ben_map),
/// [`ben_list!`](crate::ben_list), [`ben_int!`](crate::ben_int) and
/// [`ben_bytes!`](crate::ben_bytes) macros and then serialized with
/// [`encode`](BencodeMut::encode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeMut {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<BencodeMut>),
    // A BTreeMap keeps the keys sorted by raw bytes, which is exactly the
    // order the bencode specification mandates on encode.
    Dict(BTreeMap<Vec<u8>, BencodeMut>),
}

impl BencodeMut {
    #[must_use]
    pub fn new_int(value: i64) -> Self {
        BencodeMut::Int(value)
    }

    #[must_use]
    pub fn new_bytes(value: Vec<u8>) -> Self {
        BencodeMut::Bytes(value)
    }

    #[must_use]
    pub fn new_list() -> Self {
        BencodeMut::List(Vec::new())
    }

    #[must_use]
    pub fn new_dict() -> Self {
        BencodeMut::Dict(BTreeMap::new())
    }

    /// Mutable access to the inner list, if this value is a list.
    pub fn list_mut(&mut self) -> Option<&mut Vec<BencodeMut>> {
        match self {
            BencodeMut::List(values) => Some(values),
            _ => None,
        }
    }

    /// Mutable access to the inner dictionary, if this value is a dictionary.
    pub fn dict_mut(&mut self) -> Option<&mut BTreeMap<Vec<u8>, BencodeMut>> {
        match self {
            BencodeMut::Dict(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Serializes the value to its bencoded byte representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut output = Vec::new();
        self.encode_into(&mut output);
        output
    }

    fn encode_into(&self, output: &mut Vec<u8>) {
        match self {
            BencodeMut::Int(value) => {
                output.push(b'i');
                output.extend_from_slice(value.to_string().as_bytes());
                output.push(b'e');
            }
            BencodeMut::Bytes(value) => {
                output.extend_from_slice(value.len().to_string().as_bytes());
                output.push(b':');
                output.extend_from_slice(value);
            }
            BencodeMut::List(values) => {
                output.push(b'l');
                for value in values {
                    value.encode_into(output);
                }
                output.push(b'e');
            }
            BencodeMut::Dict(pairs) => {
                output.push(b'd');
                for (key, value) in pairs {
                    output.extend_from_slice(key.len().to_string().as_bytes());
                    output.push(b':');
                    output.extend_from_slice(key);
                    value.encode_into(output);
                }
                output.push(b'e');
            }
        }
    }
}

/// Conversion into raw bencode byte-string content.
///
/// Implemented for the types the builder macros accept as byte strings and
/// dictionary keys.
pub trait IntoBencodeBytes {
    fn into_bencode_bytes(self) -> Vec<u8>;
}

impl IntoBencodeBytes for Vec<u8> {
    fn into_bencode_bytes(self) -> Vec<u8> {
        self
    }
}

impl IntoBencodeBytes for &[u8] {
    fn into_bencode_bytes(self) -> Vec<u8> {
        self.to_vec()
    }
}

impl IntoBencodeBytes for &str {
    fn into_bencode_bytes(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl IntoBencodeBytes for String {
    fn into_bencode_bytes(self) -> Vec<u8> {
        self.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use crate::{ben_bytes, ben_int, ben_list, ben_map, BencodeRef};

    #[test]
    fn it_should_encode_an_integer() {
        assert_eq!(ben_int!(-7).encode(), b"i-7e");
    }

    #[test]
    fn it_should_encode_a_byte_string() {
        assert_eq!(ben_bytes!("spam").encode(), b"4:spam");
    }

    #[test]
    fn it_should_encode_a_list() {
        let message = ben_list!(ben_bytes!("spam"), ben_int!(42));

        assert_eq!(message.encode(), b"l4:spami42ee");
    }

    #[test]
    fn it_should_encode_dictionary_keys_sorted_by_raw_bytes() {
        // Inserted out of order on purpose.
        let message = ben_map! {
            "zebra" => ben_int!(1),
            "alpha" => ben_int!(2),
            "mango" => ben_int!(3)
        };

        assert_eq!(message.encode(), b"d5:alphai2e5:mangoi3e5:zebrai1ee");
    }

    #[test]
    fn it_should_encode_nested_structures() {
        let message = ben_map! {
            "files" => ben_map! {
                "a" => ben_list!(ben_int!(1), ben_int!(2))
            }
        };

        assert_eq!(message.encode(), b"d5:filesd1:ali1ei2eeee");
    }

    #[test]
    fn it_should_accept_binary_dictionary_keys() {
        let message = ben_map! {
            vec![0xffu8, 0x00] => ben_int!(1)
        };

        assert_eq!(message.encode(), [b'd', b'2', b':', 0xff, 0x00, b'i', b'1', b'e', b'e']);
    }

    #[test]
    fn encoded_output_should_decode_back_to_an_equal_shape() {
        let message = ben_map! {
            "interval" => ben_int!(600),
            "peers" => ben_bytes!(vec![10u8, 0, 0, 1, 0x1a, 0xe1])
        };

        let encoded = message.encode();
        let decoded = BencodeRef::decode(&encoded).unwrap();
        let dict = decoded.dict().unwrap();

        assert_eq!(dict.lookup(b"interval").unwrap().int(), Some(600));
        assert_eq!(
            dict.lookup(b"peers").unwrap().bytes(),
            Some(&[10u8, 0, 0, 1, 0x1a, 0xe1][..])
        );
    }

    #[test]
    fn encoding_should_be_deterministic() {
        let build = || {
            ben_map! {
                "b" => ben_int!(2),
                "a" => ben_int!(1)
            }
        };

        assert_eq!(build().encode(), build().encode());
    }
}
