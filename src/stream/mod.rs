use crate::error::Result;

pub mod join;
pub mod map;
pub mod memory;
pub mod rekey;
pub mod through;
pub mod topic;

pub use join::{Join, JoinProcessor, ValueJoiner};
pub use map::{Map, Peek};
pub use rekey::{Rekey, Rekeyer};
pub use through::Through;

/// One record of a partitioned feed. A `None` value is a tombstone.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<K, V> {
    pub key: K,
    pub value: Option<V>,
    pub partition: i32,
    pub offset: i64,
}

/// KStream represents an ordered stream of records.
///
/// Records of one partition are yielded in offset order. `Ok(None)` means the
/// stream is finished, which only happens for finite sources.
#[async_trait(?Send)]
pub trait KStream {
    type Key;
    type Value;

    async fn next(&mut self) -> Result<Option<Record<Self::Key, Self::Value>>>;
}

#[async_trait(?Send)]
pub trait KSink {
    type Key;
    type Value;

    /// `part` of `None` leaves partition choice to the sink.
    async fn send_next(
        &mut self,
        part: Option<i32>,
        k: &Self::Key,
        v: Option<&Self::Value>,
    ) -> Result<()>;
}
