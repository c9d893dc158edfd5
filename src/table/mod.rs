use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::metrics::{Counter, JoinMetrics};
use crate::store::{InMemory, KVStore, StoreConfig};
use crate::stream::{KStream, Record};

/// Write-time filter for the reference feed.
pub trait Admission<V>: Send + Sync {
    fn admit(&self, key: &str, value: &V) -> bool;
}

impl<V, F> Admission<V> for F
where
    F: Fn(&str, &V) -> bool + Send + Sync,
{
    fn admit(&self, key: &str, value: &V) -> bool {
        (self)(key, value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdmitAll;

impl<V> Admission<V> for AdmitAll {
    fn admit(&self, _key: &str, _value: &V) -> bool {
        true
    }
}

/// Where in the reference feed a value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug)]
pub struct TableEntry<V> {
    pub value: Arc<V>,
    /// `None` when the value was written directly rather than from a feed.
    pub position: Option<Position>,
}

impl<V> Clone for TableEntry<V> {
    fn clone(&self) -> Self {
        TableEntry {
            value: self.value.clone(),
            position: self.position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    /// The admission predicate refused the value; the table is unchanged.
    Rejected,
}

/// Latest admitted value per key, shared between the feed that writes it
/// and the joins that read it.
///
/// Every read and write goes through one lock, so an admitted upsert that
/// returned before a lookup started is always visible to that lookup.
/// Values are handed out as `Arc`s so joins never hold the lock while
/// combining.
pub struct MaterializedTable<V, ST = InMemory<TableEntry<V>>> {
    name: String,
    state: RwLock<ST>,
    admission: Box<dyn Admission<V>>,
    metrics: Arc<JoinMetrics>,
}

impl<V: Send + Sync + 'static> MaterializedTable<V> {
    pub fn new(name: &str) -> Self {
        Self::open(name)
    }
}

impl<V, ST> MaterializedTable<V, ST>
where
    V: Send + Sync + 'static,
    ST: KVStore<TableEntry<V>>,
{
    pub fn open(name: &str) -> Self {
        MaterializedTable {
            name: name.to_string(),
            state: RwLock::new(ST::new(StoreConfig {
                name: name.to_string(),
            })),
            admission: Box::new(AdmitAll),
            metrics: Arc::new(JoinMetrics::new()),
        }
    }

    pub fn with_admission(mut self, admission: impl Admission<V> + 'static) -> Self {
        self.admission = Box::new(admission);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<JoinMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<JoinMetrics> {
        &self.metrics
    }

    pub fn upsert(&self, key: impl Into<String>, value: V) -> Result<Upsert> {
        self.write(key.into(), value, None)
    }

    pub fn upsert_at(&self, key: impl Into<String>, value: V, position: Position) -> Result<Upsert> {
        self.write(key.into(), value, Some(position))
    }

    fn write(&self, key: String, value: V, position: Option<Position>) -> Result<Upsert> {
        if !self.admission.admit(&key, &value) {
            trace!("{}: rejected write for {}", self.name, key);
            self.metrics.incr(Counter::Rejected);
            return Ok(Upsert::Rejected);
        }

        let entry = TableEntry {
            value: Arc::new(value),
            position,
        };
        let mut state = self.state.write().map_err(|_| self.poisoned())?;
        let previous = state.put(key, entry);
        drop(state);

        self.metrics.incr(Counter::Admitted);
        Ok(match previous {
            Some(_) => Upsert::Replaced,
            None => Upsert::Inserted,
        })
    }

    pub fn lookup(&self, key: &str) -> Result<Option<Arc<V>>> {
        Ok(self.entry(key)?.map(|e| e.value))
    }

    pub fn entry(&self, key: &str) -> Result<Option<TableEntry<V>>> {
        let state = self.state.read().map_err(|_| self.poisoned())?;
        Ok(state.get(key).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        let state = self.state.read().map_err(|_| self.poisoned())?;
        Ok(state.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn poisoned(&self) -> Error {
        error!("Table {} is poisoned, joins can no longer be trusted", self.name);
        Error::poisoned(&self.name)
    }
}

impl<V, ST> fmt::Debug for MaterializedTable<V, ST> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedTable")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait(?Send)]
pub trait KTable {
    type Key;
    type Value;

    /// Applies the next change from the underlying feed. Returns `false` once
    /// the feed is exhausted.
    async fn poll(&mut self) -> Result<bool>;
}

/// Drives a reference feed into a materialized table.
pub struct TableFeed<S: KStream, ST> {
    pub(crate) stream: S,
    pub(crate) table: Arc<MaterializedTable<<S as KStream>::Value, ST>>,
}

impl<S, ST> TableFeed<S, ST>
where
    S: KStream<Key = String>,
    S::Value: Send + Sync + 'static,
    ST: KVStore<TableEntry<S::Value>>,
{
    pub fn new(stream: S, table: Arc<MaterializedTable<S::Value, ST>>) -> Self {
        TableFeed { stream, table }
    }

    pub fn table(&self) -> &Arc<MaterializedTable<S::Value, ST>> {
        &self.table
    }
}

#[async_trait(?Send)]
impl<S, ST> KTable for TableFeed<S, ST>
where
    S: KStream<Key = String>,
    S::Value: Send + Sync + 'static,
    ST: KVStore<TableEntry<S::Value>>,
{
    type Key = String;
    type Value = S::Value;

    async fn poll(&mut self) -> Result<bool> {
        match self.stream.next().await? {
            Some(Record {
                key,
                value: Some(value),
                partition,
                offset,
            }) => {
                trace!("{}: upsert {} at {}/{}", self.table.name(), key, partition, offset);
                self.table
                    .upsert_at(key, value, Position { partition, offset })?;
                Ok(true)
            }
            Some(Record { key, .. }) => {
                debug!("{}: ignoring tombstone for {}", self.table.name(), key);
                self.table.metrics().incr(Counter::Tombstones);
                Ok(true)
            }
            None => {
                info!("{}: reference feed exhausted", self.table.name());
                Ok(false)
            }
        }
    }
}
