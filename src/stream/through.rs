use std::sync::Arc;

use crate::error::Result;
use crate::metrics::{Counter, JoinMetrics};
use crate::stream::{KSink, KStream, Record};

/// Republishes every record to a side sink before passing it downstream.
///
/// The side send completes before the record is yielded, so whatever happens
/// to it further down the chain it has already been published.
pub struct Through<S, T> {
    pub(crate) stream: S,
    pub(crate) tap: Option<T>,
    pub(crate) metrics: Arc<JoinMetrics>,
}

#[async_trait(?Send)]
impl<S, T> KStream for Through<S, T>
where
    S: KStream,
    T: KSink<Key = S::Key, Value = S::Value>,
{
    type Key = S::Key;
    type Value = S::Value;

    async fn next(&mut self) -> Result<Option<Record<Self::Key, Self::Value>>> {
        let next = self.stream.next().await?;
        if let (Some(rec), Some(tap)) = (&next, self.tap.as_mut()) {
            tap.send_next(None, &rec.key, rec.value.as_ref()).await?;
            self.metrics.incr(Counter::Tapped);
        }
        Ok(next)
    }
}
