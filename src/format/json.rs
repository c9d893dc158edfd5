use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::format::Format;

#[derive(Debug)]
pub struct JSON<T>(pub(crate) PhantomData<T>);

impl<T: Serialize + DeserializeOwned> Format for JSON<T> {
    type Item = T;

    fn serialize(v: &T) -> Result<Bytes> {
        serde_json::to_vec(v)
            .map(Bytes::from)
            .map_err(|e| Error::encode("json", e))
    }

    fn deserialize(v: &[u8]) -> Result<T> {
        serde_json::from_slice(v).map_err(|e| Error::decode("json", e))
    }
}
