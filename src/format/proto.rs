use bytes::Bytes;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::format::Format;

/// Protobuf binary encoding for `prost` messages.
#[derive(Debug)]
pub struct Proto<T>(pub(crate) PhantomData<T>);

impl<T: prost::Message + Default> Format for Proto<T> {
    type Item = T;

    fn serialize(v: &T) -> Result<Bytes> {
        Ok(Bytes::from(v.encode_to_vec()))
    }

    fn deserialize(v: &[u8]) -> Result<T> {
        T::decode(v).map_err(|e| Error::decode("protobuf", e))
    }
}
