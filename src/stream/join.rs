use std::sync::Arc;

use crate::error::Result;
use crate::metrics::{Counter, JoinMetrics};
use crate::store::{InMemory, KVStore};
use crate::stream::{KStream, Record};
use crate::table::{MaterializedTable, TableEntry};

/// Combines an event with the entity it was matched against.
///
/// Implementations must be deterministic in their two inputs; the only field
/// allowed to vary between calls is a match timestamp.
pub trait ValueJoiner<L, R> {
    type Output;
    fn join(&self, left: &L, right: &R) -> Self::Output;
}

impl<L, R, J: ValueJoiner<L, R> + ?Sized> ValueJoiner<L, R> for &J {
    type Output = J::Output;

    fn join(&self, left: &L, right: &R) -> Self::Output {
        (**self).join(left, right)
    }
}

/// Adapts a closure into a [`ValueJoiner`].
#[derive(Debug, Clone, Copy)]
pub struct FnJoiner<F>(pub F);

impl<L, R, O, F> ValueJoiner<L, R> for FnJoiner<F>
where
    F: Fn(&L, &R) -> O,
{
    type Output = O;

    fn join(&self, left: &L, right: &R) -> O {
        (self.0)(left, right)
    }
}

/// Inner stream-table join against a materialized table.
///
/// A miss is final: the event is dropped and never looked at again, even if
/// the matching entity shows up a moment later.
pub struct JoinProcessor<R, J, ST = InMemory<TableEntry<R>>> {
    table: Arc<MaterializedTable<R, ST>>,
    joiner: J,
    metrics: Arc<JoinMetrics>,
}

impl<R, J, ST> JoinProcessor<R, J, ST>
where
    R: Send + Sync + 'static,
    ST: KVStore<TableEntry<R>>,
{
    pub fn new(table: Arc<MaterializedTable<R, ST>>, joiner: J, metrics: Arc<JoinMetrics>) -> Self {
        JoinProcessor {
            table,
            joiner,
            metrics,
        }
    }

    /// Looks `key` up and combines on a hit. `Ok(None)` is a miss, which is
    /// not an error. Only a broken table surfaces as `Err`.
    pub fn process<E>(&self, key: &str, event: &E) -> Result<Option<J::Output>>
    where
        J: ValueJoiner<E, R>,
    {
        match self.table.lookup(key)? {
            Some(entity) => {
                self.metrics.incr(Counter::Matched);
                Ok(Some(self.joiner.join(event, &*entity)))
            }
            None => {
                trace!("No match for {} in {}, dropping event", key, self.table.name());
                self.metrics.incr(Counter::Missed);
                Ok(None)
            }
        }
    }
}

pub struct Join<S, R, J, ST = InMemory<TableEntry<R>>> {
    pub(crate) stream: S,
    pub(crate) processor: JoinProcessor<R, J, ST>,
}

#[async_trait(?Send)]
impl<S, R, J, ST> KStream for Join<S, R, J, ST>
where
    S: KStream<Key = String>,
    R: Send + Sync + 'static,
    J: ValueJoiner<S::Value, R>,
    ST: KVStore<TableEntry<R>>,
{
    type Key = String;
    type Value = J::Output;

    async fn next(&mut self) -> Result<Option<Record<String, J::Output>>> {
        loop {
            let rec = match self.stream.next().await? {
                Some(rec) => rec,
                None => return Ok(None),
            };
            let event = match &rec.value {
                Some(v) => v,
                None => {
                    warn!("Dropping null event {}/{} for {}", rec.partition, rec.offset, rec.key);
                    self.processor.metrics.incr(Counter::Malformed);
                    continue;
                }
            };
            if let Some(joined) = self.processor.process(&rec.key, event)? {
                return Ok(Some(Record {
                    key: rec.key,
                    value: Some(joined),
                    partition: rec.partition,
                    offset: rec.offset,
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::memory;

    fn processor() -> (
        Arc<MaterializedTable<String>>,
        JoinProcessor<String, FnJoiner<fn(&u32, &String) -> String>>,
    ) {
        let metrics = Arc::new(JoinMetrics::new());
        let table = Arc::new(MaterializedTable::new("names").with_metrics(metrics.clone()));
        fn label(n: &u32, name: &String) -> String {
            format!("{}:{}", name, n)
        }
        let joiner = FnJoiner(label as fn(&u32, &String) -> String);
        (table.clone(), JoinProcessor::new(table, joiner, metrics))
    }

    #[test]
    fn hit_combines() {
        let (table, p) = processor();
        table.upsert("U1", "alice".to_string()).unwrap();
        assert_eq!(p.process("U1", &7u32).unwrap(), Some("alice:7".to_string()));
        assert_eq!(table.metrics().get(Counter::Matched), 1);
    }

    #[test]
    fn miss_is_silent_and_permanent() {
        let (table, p) = processor();
        assert_eq!(p.process("U9", &1u32).unwrap(), None);

        table.upsert("U9", "late".to_string()).unwrap();
        // Nothing was buffered, so only a new event can match.
        assert_eq!(table.metrics().get(Counter::Matched), 0);
        assert_eq!(table.metrics().get(Counter::Missed), 1);
        assert_eq!(p.process("U9", &2u32).unwrap(), Some("late:2".to_string()));
    }

    #[test]
    fn joins_see_latest_value() {
        let (table, p) = processor();
        table.upsert("U1", "A".to_string()).unwrap();
        table.upsert("U1", "B".to_string()).unwrap();
        assert_eq!(p.process("U1", &0u32).unwrap(), Some("B:0".to_string()));
    }

    #[tokio::test]
    async fn join_stream_drops_misses() {
        let (table, p) = processor();
        table.upsert("U1", "alice".to_string()).unwrap();

        let (mut input, source) = memory::topic::<String, u32>("events");
        input.pipe_input("U1".into(), 1).unwrap();
        input.pipe_input("U2".into(), 2).unwrap();
        input.pipe_input("U1".into(), 3).unwrap();
        drop(input);

        let mut joined = Join {
            stream: source,
            processor: p,
        };
        let mut out = vec![];
        while let Some(rec) = joined.next().await.unwrap() {
            out.push(rec.value.unwrap());
        }
        assert_eq!(out, vec!["alice:1".to_string(), "alice:3".to_string()]);
        assert_eq!(table.metrics().get(Counter::Missed), 1);
    }

    #[tokio::test]
    async fn null_event_is_malformed_not_missed() {
        let (table, p) = processor();
        table.upsert("U1", "alice".to_string()).unwrap();

        let (mut input, source) = memory::topic::<String, u32>("events");
        input.pipe_tombstone("U1".into()).unwrap();
        input.pipe_input("U1".into(), 5).unwrap();
        drop(input);

        let mut joined = Join {
            stream: source,
            processor: p,
        };
        let rec = joined.next().await.unwrap().unwrap();
        assert_eq!((rec.value.as_deref(), rec.offset), (Some("alice:5"), 1));
        assert!(joined.next().await.unwrap().is_none());
        assert_eq!(table.metrics().get(Counter::Malformed), 1);
        assert_eq!(table.metrics().get(Counter::Missed), 0);
    }
}
