//! In-process feeds for tests and local runs.
//!
//! A topic is a single partition: offsets start at 0 and every piped record,
//! tombstones included, takes the next one. The source ends once all inputs
//! are dropped and the backlog is drained.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Error, Result};
use crate::stream::{KSink, KStream, Record};

pub fn topic<K, V>(name: &str) -> (MemoryInput<K, V>, MemorySource<K, V>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let input = MemoryInput {
        name: name.to_string(),
        next_offset: 0,
        tx,
    };
    let source = MemorySource {
        name: name.to_string(),
        rx,
    };
    (input, source)
}

pub struct MemoryInput<K, V> {
    name: String,
    next_offset: i64,
    tx: UnboundedSender<Record<K, V>>,
}

impl<K, V> MemoryInput<K, V> {
    pub fn pipe_input(&mut self, key: K, value: V) -> Result<()> {
        self.push(key, Some(value))
    }

    pub fn pipe_tombstone(&mut self, key: K) -> Result<()> {
        self.push(key, None)
    }

    fn push(&mut self, key: K, value: Option<V>) -> Result<()> {
        let rec = Record {
            key,
            value,
            partition: 0,
            offset: self.next_offset,
        };
        self.tx.send(rec).map_err(|_| Error::Closed {
            name: self.name.clone(),
        })?;
        self.next_offset += 1;
        Ok(())
    }
}

pub struct MemorySource<K, V> {
    name: String,
    rx: UnboundedReceiver<Record<K, V>>,
}

impl<K, V> MemorySource<K, V> {
    /// A finished topic holding `records`.
    pub fn from_records(name: &str, records: impl IntoIterator<Item = (K, V)>) -> Self {
        let (mut input, source) = topic(name);
        for (k, v) in records {
            // The receiver is alive, so this cannot fail.
            let _ = input.pipe_input(k, v);
        }
        source
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait(?Send)]
impl<K, V> KStream for MemorySource<K, V> {
    type Key = K;
    type Value = V;

    async fn next(&mut self) -> Result<Option<Record<K, V>>> {
        Ok(self.rx.recv().await)
    }
}

/// Collects everything sent to it. Clones share the same buffer.
pub struct MemorySink<K, V> {
    name: String,
    records: Arc<Mutex<Vec<(K, Option<V>)>>>,
}

impl<K, V> Clone for MemorySink<K, V> {
    fn clone(&self) -> Self {
        MemorySink {
            name: self.name.clone(),
            records: self.records.clone(),
        }
    }
}

impl<K: Clone, V: Clone> MemorySink<K, V> {
    pub fn new(name: &str) -> Self {
        MemorySink {
            name: name.to_string(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read_records(&self) -> Vec<(K, Option<V>)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn read_key_values(&self) -> Vec<(K, V)> {
        self.read_records()
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect()
    }

    pub fn read_values(&self) -> Vec<V> {
        self.read_key_values().into_iter().map(|(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait(?Send)]
impl<K: Clone, V: Clone> KSink for MemorySink<K, V> {
    type Key = K;
    type Value = V;

    async fn send_next(&mut self, _part: Option<i32>, k: &K, v: Option<&V>) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::poisoned(&self.name))?;
        records.push((k.clone(), v.cloned()));
        Ok(())
    }
}
