use bytes::Bytes;

use crate::error::Result;

pub mod json;
pub mod proto;

/// Codec for one side (key or value) of a feed.
pub trait Format {
    type Item;
    fn serialize(v: &Self::Item) -> Result<Bytes>;
    fn deserialize(v: &[u8]) -> Result<Self::Item>;
}

/// Plain UTF-8 strings, used for record keys.
#[derive(Debug)]
pub struct Str;

impl Format for Str {
    type Item = String;

    fn serialize(v: &String) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(v.as_bytes()))
    }

    fn deserialize(v: &[u8]) -> Result<String> {
        String::from_utf8(v.to_vec()).map_err(|e| crate::Error::decode("string", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_rejects_invalid_utf8() {
        assert!(Str::deserialize(&[0xff, 0xfe]).is_err());
        assert_eq!(Str::deserialize(b"C1").unwrap(), "C1");
    }
}
