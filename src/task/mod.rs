use std::sync::Arc;

use crate::error::Result;
use crate::format::Format;
use crate::metrics::JoinMetrics;
use crate::store::KVStore;
use crate::stream::join::{Join, JoinProcessor, ValueJoiner};
use crate::stream::map::{Map, Peek};
use crate::stream::rekey::{Rekey, Rekeyer};
use crate::stream::through::Through;
use crate::stream::topic::{TypedConsumer, TypedProducer};
use crate::stream::{KSink, KStream, Record};
use crate::table::{KTable, MaterializedTable, TableEntry, TableFeed};
use crate::Config;

/// Task is a base unit of computation.
///
/// It owns one chain of stream adaptors, built fluently from a source, and
/// drives it record by record once a sink (or a table) is attached. Each
/// task runs within a single thread; tasks that share a table run
/// side by side.
pub struct Task<S> {
    cfg: Config,
    name: String,
    metrics: Arc<JoinMetrics>,
    _stream: S,
}

impl Task<()> {
    pub fn new(cfg: Config, name: &str) -> Self {
        Self {
            _stream: (),
            cfg,
            name: name.to_string(),
            metrics: Arc::new(JoinMetrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<JoinMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Consumes a Kafka topic. Each task/topic pair is its own consumer group.
    pub fn stream<KF: Format, VF: Format>(self, topic: &str) -> Result<Task<TypedConsumer<KF, VF>>> {
        let cfg = self.cfg.clone().set_group(&format!("{}-{}", self.name, topic));
        let consumer = TypedConsumer::new(&cfg, topic, self.metrics.clone())?;
        Ok(self.chain(consumer))
    }

    pub fn source<S: KStream>(self, stream: S) -> Task<S> {
        self.chain(stream)
    }
}

impl<S> Task<S> {
    fn chain<T>(self, stream: T) -> Task<T> {
        Task {
            cfg: self.cfg,
            name: self.name,
            metrics: self.metrics,
            _stream: stream,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<JoinMetrics> {
        &self.metrics
    }
}

impl<S: KStream> Task<S> {
    pub fn map<V, F: Fn(&S::Key, S::Value) -> V>(self, mapper: F) -> Task<Map<S, F>> {
        Task {
            cfg: self.cfg,
            name: self.name,
            metrics: self.metrics,
            _stream: Map {
                stream: self._stream,
                mapper,
            },
        }
    }

    pub fn peek<F: Fn(&Record<S::Key, S::Value>)>(self, observer: F) -> Task<Peek<S, F>> {
        Task {
            cfg: self.cfg,
            name: self.name,
            metrics: self.metrics,
            _stream: Peek {
                stream: self._stream,
                observer,
            },
        }
    }

    /// Re-keys every event by the foreign key `extract` finds in it.
    pub fn rekey<F>(self, extract: F) -> Task<Rekey<S, F>>
    where
        F: Fn(&S::Value) -> Option<&str>,
    {
        let rekeyer = Rekeyer::new(extract, self.metrics.clone());
        Task {
            cfg: self.cfg,
            name: self.name,
            metrics: self.metrics,
            _stream: Rekey {
                stream: self._stream,
                rekeyer,
            },
        }
    }

    /// Publishes every record to `tap` before handing it on.
    pub fn through<T>(self, tap: T) -> Task<Through<S, T>>
    where
        T: KSink<Key = S::Key, Value = S::Value>,
    {
        self.through_opt(Some(tap))
    }

    pub fn through_opt<T>(self, tap: Option<T>) -> Task<Through<S, T>>
    where
        T: KSink<Key = S::Key, Value = S::Value>,
    {
        let metrics = self.metrics.clone();
        Task {
            cfg: self.cfg,
            name: self.name,
            metrics: self.metrics,
            _stream: Through {
                stream: self._stream,
                tap,
                metrics,
            },
        }
    }

    /// Inner join against `table`; events without a match are dropped.
    pub fn join<R, J, ST>(self, table: Arc<MaterializedTable<R, ST>>, joiner: J) -> Task<Join<S, R, J, ST>>
    where
        S: KStream<Key = String>,
        R: Send + Sync + 'static,
        J: ValueJoiner<S::Value, R>,
        ST: KVStore<TableEntry<R>>,
    {
        let processor = JoinProcessor::new(table, joiner, self.metrics.clone());
        Task {
            cfg: self.cfg,
            name: self.name,
            metrics: self.metrics,
            _stream: Join {
                stream: self._stream,
                processor,
            },
        }
    }

    /// Materializes this stream into `table`.
    pub fn table<ST>(self, table: Arc<MaterializedTable<S::Value, ST>>) -> Task<TableFeed<S, ST>>
    where
        S: KStream<Key = String>,
        S::Value: Send + Sync + 'static,
        ST: KVStore<TableEntry<S::Value>>,
    {
        Task {
            cfg: self.cfg,
            name: self.name,
            metrics: self.metrics,
            _stream: TableFeed::new(self._stream, table),
        }
    }

    pub async fn to<KF, VF>(self, topic: &str) -> Result<()>
    where
        KF: Format<Item = S::Key>,
        VF: Format<Item = S::Value>,
    {
        let sink = TypedProducer::<KF, VF>::new(&self.cfg, topic)?;
        self.sink(sink).await
    }

    /// Drives the chain into `sink` until the source is exhausted.
    pub async fn sink<T>(mut self, mut sink: T) -> Result<()>
    where
        T: KSink<Key = S::Key, Value = S::Value>,
    {
        info!("{}: sink enter", self.name);
        while let Some(rec) = self._stream.next().await? {
            // Partitioner picks by key.
            sink.send_next(None, &rec.key, rec.value.as_ref()).await?;
        }
        info!("{}: stream finished", self.name);
        Ok(())
    }
}

impl<T: KTable> Task<T> {
    /// Applies the feed until it is exhausted.
    pub async fn run(mut self) -> Result<()> {
        info!("{}: materializing", self.name);
        while self._stream.poll().await? {}
        Ok(())
    }
}
