//! Payload stores.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use vercache_core::{CacheError, CachingConfig};

/// Create-only store of serialized payloads.
///
/// Entries are never updated or deleted in normal operation: a changed dependency
/// produces a new key and the old entry is left to the store's own eviction.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a payload.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a payload under a new key.
    ///
    /// Fails with [`CacheError::KeyAlreadyExists`] when the key is present.
    async fn add(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

    /// Remove every payload.
    async fn flush_all(&self) -> Result<(), CacheError>;
}

/// In-memory payload store with optional FIFO capacity bound.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: DashMap<String, Vec<u8>>,
    order: Mutex<VecDeque<String>>,
    capacity: Option<usize>,
}

impl MemoryCacheBackend {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store evicting its oldest entries beyond `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Create a store bounded by [`CachingConfig::memory_capacity`], when set.
    pub fn from_config(config: &CachingConfig) -> Self {
        match config.memory_capacity {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::new(),
        }
    }

    /// Capacity bound, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&self, key: &str) {
        let Some(capacity) = self.capacity else {
            return;
        };
        let mut order = self.order.lock();
        order.push_back(key.to_string());
        while order.len() > capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    async fn add(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => return Err(CacheError::KeyAlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(value.to_vec());
            }
        }
        self.evict(key);
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        let mut order = self.order.lock();
        self.entries.clear();
        order.clear();
        Ok(())
    }
}
