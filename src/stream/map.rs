use crate::error::Result;
use crate::stream::{KStream, Record};

pub struct Map<S, F> {
    pub(crate) stream: S,
    pub(crate) mapper: F,
}

#[async_trait(?Send)]
impl<S, F, V> KStream for Map<S, F>
where
    S: KStream,
    F: Fn(&S::Key, S::Value) -> V,
{
    type Key = S::Key;
    type Value = V;

    async fn next(&mut self) -> Result<Option<Record<Self::Key, Self::Value>>> {
        Ok(self.stream.next().await?.map(|rec| {
            let value = rec.value.map(|v| (self.mapper)(&rec.key, v));
            Record {
                key: rec.key,
                value,
                partition: rec.partition,
                offset: rec.offset,
            }
        }))
    }
}

/// Observes every record without changing it.
pub struct Peek<S, F> {
    pub(crate) stream: S,
    pub(crate) observer: F,
}

#[async_trait(?Send)]
impl<S, F> KStream for Peek<S, F>
where
    S: KStream,
    F: Fn(&Record<S::Key, S::Value>),
{
    type Key = S::Key;
    type Value = S::Value;

    async fn next(&mut self) -> Result<Option<Record<Self::Key, Self::Value>>> {
        let next = self.stream.next().await?;
        if let Some(rec) = &next {
            (self.observer)(rec);
        }
        Ok(next)
    }
}
