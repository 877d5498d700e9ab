//! Counter store keyed by identity.

use async_trait::async_trait;
use dashmap::DashMap;

use vercache_core::{Identity, Version, VersionError, DEFAULT_VERSION};

/// Versions returned by one batched read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBatch {
    /// Master version, when the store maintains one.
    pub master: Option<Version>,
    /// One version per requested identity, in request order.
    pub versions: Vec<Version>,
}

impl VersionBatch {
    /// A batch without a master version.
    pub fn new(versions: Vec<Version>) -> Self {
        Self {
            master: None,
            versions,
        }
    }

    /// Set the master version.
    pub fn with_master(mut self, master: Version) -> Self {
        self.master = Some(master);
        self
    }
}

/// Counter store keyed by identity.
///
/// Identities never incremented read as [`DEFAULT_VERSION`]. Failures are raised,
/// never replaced by the default.
#[async_trait]
pub trait KeyVersioner: Send + Sync {
    /// Read the versions of `keys` in one round trip. Has no side effects on counters.
    async fn get_multi(&self, keys: &[Identity]) -> Result<VersionBatch, VersionError>;

    /// Read a single version.
    async fn get(&self, key: &Identity) -> Result<Version, VersionError> {
        let batch = self.get_multi(std::slice::from_ref(key)).await?;
        batch
            .versions
            .into_iter()
            .next()
            .ok_or_else(|| VersionError::Get(format!("no version returned for '{}'", key)))
    }

    /// Atomically increment the version of `key`.
    async fn incr(&self, key: &Identity) -> Result<(), VersionError>;

    /// Reset every counter.
    async fn flush_all(&self) -> Result<(), VersionError>;
}

/// In-process key versioner.
#[derive(Debug, Default)]
pub struct MemoryKeyVersioner {
    versions: DashMap<Identity, Version>,
}

impl MemoryKeyVersioner {
    /// Create an empty versioner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities that were incremented at least once.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether no identity was ever incremented.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[async_trait]
impl KeyVersioner for MemoryKeyVersioner {
    async fn get_multi(&self, keys: &[Identity]) -> Result<VersionBatch, VersionError> {
        let versions = keys
            .iter()
            .map(|key| self.versions.get(key).map_or(DEFAULT_VERSION, |v| *v))
            .collect();
        Ok(VersionBatch::new(versions))
    }

    async fn incr(&self, key: &Identity) -> Result<(), VersionError> {
        *self.versions.entry(key.clone()).or_insert(DEFAULT_VERSION) += 1;
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), VersionError> {
        self.versions.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_keys_read_default() {
        let kv = MemoryKeyVersioner::new();
        let batch = kv
            .get_multi(&["a".into(), "b".into()])
            .await
            .unwrap();
        assert_eq!(batch, VersionBatch::new(vec![0, 0]));
        assert_eq!(kv.get(&"a".into()).await.unwrap(), DEFAULT_VERSION);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_incr_is_monotonic() {
        let kv = MemoryKeyVersioner::new();
        let key = Identity::from("user:id=1");

        let mut previous = kv.get(&key).await.unwrap();
        for _ in 0..5 {
            kv.incr(&key).await.unwrap();
            let current = kv.get(&key).await.unwrap();
            assert!(current > previous);
            previous = current;
        }
        assert_eq!(previous, 5);
    }

    #[tokio::test]
    async fn test_get_multi_preserves_order() {
        let kv = MemoryKeyVersioner::new();
        kv.incr(&"b".into()).await.unwrap();
        kv.incr(&"b".into()).await.unwrap();
        kv.incr(&"c".into()).await.unwrap();

        let batch = kv
            .get_multi(&["c".into(), "a".into(), "b".into()])
            .await
            .unwrap();
        assert_eq!(batch.versions, vec![1, 0, 2]);
        assert_eq!(batch.master, None);
    }

    #[tokio::test]
    async fn test_flush_all() {
        let kv = MemoryKeyVersioner::new();
        kv.incr(&"a".into()).await.unwrap();
        kv.flush_all().await.unwrap();
        assert_eq!(kv.get(&"a".into()).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let kv = Arc::new(MemoryKeyVersioner::new());
        let key = Identity::from("hot");

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let kv = kv.clone();
                let key = key.clone();
                tokio::spawn(async move { kv.incr(&key).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(kv.get(&key).await.unwrap(), 50);
    }
}
