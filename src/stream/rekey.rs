use std::sync::Arc;

use crate::error::Result;
use crate::metrics::{Counter, JoinMetrics};
use crate::stream::{KStream, Record};

/// Re-keys events by a foreign key extracted from their payload.
///
/// Events without a usable key are malformed: they are counted, logged and
/// dropped, never forwarded.
pub struct Rekeyer<F> {
    extract: F,
    metrics: Arc<JoinMetrics>,
}

impl<F> Rekeyer<F> {
    pub fn new<V>(extract: F, metrics: Arc<JoinMetrics>) -> Self
    where
        F: Fn(&V) -> Option<&str>,
    {
        Rekeyer { extract, metrics }
    }

    pub fn rekey<V>(&self, event: V) -> Option<(String, V)>
    where
        F: Fn(&V) -> Option<&str>,
    {
        let key = match (self.extract)(&event) {
            Some(k) if !k.is_empty() => k.to_owned(),
            _ => {
                self.malformed("event has no foreign key");
                return None;
            }
        };
        self.metrics.incr(Counter::Rekeyed);
        Some((key, event))
    }

    fn malformed(&self, reason: &str) {
        warn!("Dropping malformed event: {}", reason);
        self.metrics.incr(Counter::Malformed);
    }
}

/// Stream adaptor around [`Rekeyer`]. Records keep their source partition and
/// offset and are yielded in source order.
pub struct Rekey<S, F> {
    pub(crate) stream: S,
    pub(crate) rekeyer: Rekeyer<F>,
}

#[async_trait(?Send)]
impl<S, F> KStream for Rekey<S, F>
where
    S: KStream,
    F: Fn(&S::Value) -> Option<&str>,
{
    type Key = String;
    type Value = S::Value;

    async fn next(&mut self) -> Result<Option<Record<String, S::Value>>> {
        loop {
            let rec = match self.stream.next().await? {
                Some(rec) => rec,
                None => return Ok(None),
            };
            let value = match rec.value {
                Some(v) => v,
                None => {
                    self.rekeyer.malformed("event value is null");
                    continue;
                }
            };
            if let Some((key, value)) = self.rekeyer.rekey(value) {
                trace!("Rekeyed event {}/{} to {}", rec.partition, rec.offset, key);
                return Ok(Some(Record {
                    key,
                    value: Some(value),
                    partition: rec.partition,
                    offset: rec.offset,
                }));
            }
        }
    }
}
