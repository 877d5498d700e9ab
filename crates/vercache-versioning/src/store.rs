//! String counter stores backing the master-version key versioner.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Counter store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The store rejected a command.
    #[error("command failed: {0}")]
    Command(String),

    /// An increment hit a value that is not an integer.
    #[error("value of '{0}' is not an integer")]
    NotAnInteger(String),
}

/// A shared key/value store with atomic integer increments.
///
/// Mirrors the small command set of a networked KV store so the same versioning logic
/// runs against Redis in production and a map in tests.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read many values in one round trip; absent keys read as `None`.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    /// Atomically increment an integer value, creating it at 1. Returns the new value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Set a value only if the key is absent. Returns whether the value was set.
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Set a value unconditionally.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove every key.
    async fn flush_all(&self) -> Result<(), StoreError>;
}

/// In-process counter store.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    values: DashMap<String, String>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        Ok(keys
            .iter()
            .map(|key| self.values.get(key).map(|v| v.clone()))
            .collect())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entry = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| "0".to_string());
        let current: i64 = entry
            .parse()
            .map_err(|_| StoreError::NotAnInteger(key.to_string()))?;
        let next = current + 1;
        *entry = next.to_string();
        Ok(next)
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        match self.values.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(true)
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        self.values.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incr_creates_and_counts() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.incr("a").await.unwrap(), 1);
        assert_eq!(store.incr("a").await.unwrap(), 2);
        assert_eq!(
            store.mget(&["a".into(), "b".into()]).await.unwrap(),
            vec![Some("2".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_incr_rejects_non_integer() {
        let store = MemoryCounterStore::new();
        store.set("cache", "off").await.unwrap();
        assert_eq!(
            store.incr("cache").await.unwrap_err(),
            StoreError::NotAnInteger("cache".into())
        );
    }

    #[tokio::test]
    async fn test_set_nx() {
        let store = MemoryCounterStore::new();
        assert!(store.set_nx("k", "1").await.unwrap());
        assert!(!store.set_nx("k", "2").await.unwrap());
        assert_eq!(store.mget(&["k".into()]).await.unwrap(), vec![Some("1".into())]);

        store.flush_all().await.unwrap();
        assert_eq!(store.mget(&["k".into()]).await.unwrap(), vec![None]);
    }
}
