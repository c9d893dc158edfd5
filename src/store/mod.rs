use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub name: String,
}

/// Point-lookup key/value backend underneath a materialized table.
///
/// Stores are not synchronized themselves; the owning table serializes
/// access to them.
pub trait KVStore<V>: Send + Sync {
    fn new(cfg: StoreConfig) -> Self
    where
        Self: Sized;
    fn get(&self, key: &str) -> Option<&V>;
    fn put(&mut self, key: String, value: V) -> Option<V>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct InMemory<V> {
    name: String,
    inner: HashMap<String, V>,
}

impl<V: Send + Sync> KVStore<V> for InMemory<V> {
    fn new(cfg: StoreConfig) -> Self {
        trace!("Creating in-memory store {}", cfg.name);
        Self {
            name: cfg.name,
            inner: HashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<&V> {
        self.inner.get(key)
    }

    fn put(&mut self, key: String, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<V> std::fmt::Debug for InMemory<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemory")
            .field("name", &self.name)
            .field("len", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_returns_previous() {
        let mut store = InMemory::new(StoreConfig { name: "users".into() });
        assert!(store.is_empty());
        assert_eq!(store.put("U1".into(), "A"), None);
        assert_eq!(store.put("U1".into(), "B"), Some("A"));
        assert_eq!(store.get("U1"), Some(&"B"));
        assert_eq!(store.len(), 1);
    }
}
