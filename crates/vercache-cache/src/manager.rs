//! Compute-or-fetch coordination.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use vercache_core::{CacheError, CacheKey, KeyPart, RequestId, Result, Thing};
use vercache_versioning::Versioner;

use crate::backend::CacheBackend;
use crate::events::{CacheEvent, CacheEventKind, EventSink};
use crate::result::CacheResult;
use crate::serializer::Serializer;

/// Caches computed payloads under version-stamped keys.
///
/// The manager holds no state of its own; counters live in the versioner and payloads
/// in the backend.
pub struct CacheManager<T> {
    versioner: Arc<Versioner>,
    backend: Arc<dyn CacheBackend>,
    serializer: Arc<dyn Serializer<T>>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl<T> Clone for CacheManager<T> {
    fn clone(&self) -> Self {
        Self {
            versioner: self.versioner.clone(),
            backend: self.backend.clone(),
            serializer: self.serializer.clone(),
            sinks: self.sinks.clone(),
        }
    }
}

impl<T> CacheManager<T> {
    /// Create a manager from its collaborators.
    pub fn new(
        versioner: Arc<Versioner>,
        backend: Arc<dyn CacheBackend>,
        serializer: Arc<dyn Serializer<T>>,
    ) -> Self {
        Self {
            versioner,
            backend,
            serializer,
            sinks: Vec::new(),
        }
    }

    /// Register an event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// The versioner.
    pub fn versioner(&self) -> &Arc<Versioner> {
        &self.versioner
    }

    /// The payload backend.
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Fetch the payload for `bases` and `dependencies`, computing and storing it on a miss.
    ///
    /// `compute` runs at most once and only when nothing usable is cached. Failures to
    /// read versions or to read the backend are returned untouched, so the caller can
    /// fall back to computing uncached. Failures after `compute` ran are recorded on the
    /// returned miss (see [`CacheResult::error`]).
    pub async fn get_or_cache<F, Fut>(
        &self,
        compute: F,
        bases: &[KeyPart],
        dependencies: &[Thing],
    ) -> Result<CacheResult<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.get_or_cache_for(None, compute, bases, dependencies)
            .await
    }

    /// Like [`CacheManager::get_or_cache`], tagging events with a request.
    pub async fn get_or_cache_for<F, Fut>(
        &self,
        request_id: Option<&RequestId>,
        compute: F,
        bases: &[KeyPart],
        dependencies: &[Thing],
    ) -> Result<CacheResult<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let versioned = self.versioner.snapshot(dependencies).await?;
        let key = CacheKey::new(bases.to_vec(), versioned.into_dependencies());
        let raw_key = key.key();

        let mut failure = None;
        if let Some(raw) = self.backend.get(&raw_key).await? {
            match self.serializer.deserialize(&raw) {
                Ok(data) => {
                    debug!(key = %raw_key, root = %key.root(), "cache hit");
                    self.emit(CacheEventKind::Hit, &key, request_id);
                    return Ok(CacheResult::hit(key, data));
                }
                Err(e) => {
                    warn!(key = %raw_key, error = %e, "cached payload unreadable, recomputing");
                    failure = Some(e);
                }
            }
        }

        let data = compute().await;
        if let Err(e) = self.store(&raw_key, &data).await {
            failure.get_or_insert(e);
        }

        debug!(key = %raw_key, root = %key.root(), "cache miss");
        self.emit(CacheEventKind::Miss, &key, request_id);
        let result = CacheResult::miss(key, data);
        Ok(match failure {
            Some(e) => result.with_error(e),
            None => result,
        })
    }

    /// Store a computed payload. A concurrent writer storing the key first is success.
    async fn store(&self, raw_key: &str, data: &T) -> std::result::Result<(), CacheError> {
        let raw = self.serializer.serialize(data).map_err(|e| {
            warn!(key = %raw_key, error = %e, "failed to serialize payload, not caching");
            e
        })?;

        match self.backend.add(raw_key, &raw).await {
            Ok(()) => Ok(()),
            Err(CacheError::KeyAlreadyExists(_)) => {
                debug!(key = %raw_key, "payload stored concurrently");
                Ok(())
            }
            Err(e) => {
                warn!(key = %raw_key, error = %e, "failed to store payload");
                Err(e)
            }
        }
    }

    fn emit(&self, kind: CacheEventKind, key: &CacheKey, request_id: Option<&RequestId>) {
        if self.sinks.is_empty() {
            return;
        }
        let mut event = CacheEvent::new(kind, key.root());
        if let Some(id) = request_id {
            event = event.with_request_id(id.clone());
        }
        for sink in &self.sinks {
            sink.emit(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryCacheBackend;
    use crate::events::ChannelSink;
    use crate::result::CacheStatus;
    use crate::serializer::JsonSerializer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vercache_core::Error;
    use vercache_versioning::MemoryKeyVersioner;

    fn manager_with(backend: Arc<dyn CacheBackend>) -> CacheManager<String> {
        let versioner = Versioner::with_default_inspector(Arc::new(MemoryKeyVersioner::new()));
        CacheManager::new(Arc::new(versioner), backend, Arc::new(JsonSerializer::new()))
    }

    fn bases() -> Vec<KeyPart> {
        vec!["mod".into(), "fn".into()]
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let manager = manager_with(Arc::new(MemoryCacheBackend::new()));

        let first = manager
            .get_or_cache(|| async { "X".to_string() }, &bases(), &[])
            .await
            .unwrap();
        assert!(!first.is_hit());
        assert_eq!(first.data(), "X");

        let second = manager
            .get_or_cache(|| async { "Y".to_string() }, &bases(), &[])
            .await
            .unwrap();
        assert!(second.is_hit());
        assert_eq!(second.data(), "X");
        assert_eq!(first.key(), second.key());
    }

    #[tokio::test]
    async fn test_compute_runs_only_on_miss() {
        let manager = manager_with(Arc::new(MemoryCacheBackend::new()));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            manager
                .get_or_cache(
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        "v".to_string()
                    },
                    &bases(),
                    &[Thing::table("user")],
                )
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_increment_invalidates() {
        let manager = manager_with(Arc::new(MemoryCacheBackend::new()));
        let deps = [Thing::row("user", [("id", 1)])];

        let first = manager
            .get_or_cache(|| async { "old".to_string() }, &bases(), &deps)
            .await
            .unwrap();
        manager.versioner().incr(&deps[0]).await.unwrap();
        let second = manager
            .get_or_cache(|| async { "new".to_string() }, &bases(), &deps)
            .await
            .unwrap();

        assert!(!second.is_hit());
        assert_eq!(second.data(), "new");
        assert_ne!(first.key_hash(), second.key_hash());
    }

    #[tokio::test]
    async fn test_events_carry_root_and_request() {
        let (sink, mut rx) = ChannelSink::new();
        let manager = manager_with(Arc::new(MemoryCacheBackend::new())).with_sink(Arc::new(sink));
        let request = RequestId::from_string("req-9");

        manager
            .get_or_cache_for(Some(&request), || async { "a".to_string() }, &bases(), &[])
            .await
            .unwrap();
        manager
            .get_or_cache(|| async { "a".to_string() }, &bases(), &[])
            .await
            .unwrap();

        let miss = rx.recv().await.unwrap();
        assert_eq!(miss.kind, CacheEventKind::Miss);
        assert_eq!(miss.root, "mod:fn");
        assert_eq!(miss.request_id, Some(request));

        let hit = rx.recv().await.unwrap();
        assert!(hit.is_hit());
        assert_eq!(hit.request_id, None);
    }

    #[tokio::test]
    async fn test_unreadable_payload_is_recomputed() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let manager = manager_with(backend.clone());
        let key = manager
            .get_or_cache(|| async { "a".to_string() }, &bases(), &[])
            .await
            .unwrap()
            .key()
            .clone();

        backend.flush_all().await.unwrap();
        backend.add(&key.key(), b"garbage").await.unwrap();

        let result = manager
            .get_or_cache(|| async { "fresh".to_string() }, &bases(), &[])
            .await
            .unwrap();
        assert!(!result.is_hit());
        assert_eq!(result.data(), "fresh");
        assert_eq!(result.status(), CacheStatus::Error);
        assert!(matches!(result.error(), Some(CacheError::Deserialization(_))));
    }

    /// Backend with failing reads or writes.
    struct DownBackend {
        adds: AtomicUsize,
        fail_get: bool,
        fail_add: bool,
    }

    #[async_trait]
    impl CacheBackend for DownBackend {
        async fn get(&self, _key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
            if self.fail_get {
                Err(CacheError::Get("connection refused".into()))
            } else {
                Ok(None)
            }
        }
        async fn add(&self, key: &str, _value: &[u8]) -> std::result::Result<(), CacheError> {
            self.adds.fetch_add(1, Ordering::SeqCst);
            if self.fail_add {
                Err(CacheError::Add("connection reset".into()))
            } else {
                Err(CacheError::KeyAlreadyExists(key.to_string()))
            }
        }
        async fn flush_all(&self) -> std::result::Result<(), CacheError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_backend_read_failure_propagates() {
        let manager = manager_with(Arc::new(DownBackend {
            adds: AtomicUsize::new(0),
            fail_get: true,
            fail_add: false,
        }));
        let calls = AtomicUsize::new(0);

        let err = manager
            .get_or_cache(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "x".to_string()
                },
                &bases(),
                &[],
            )
            .await
            .unwrap_err();
        assert_eq!(err, Error::Cache(CacheError::Get("connection refused".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_writer_is_not_an_error() {
        let backend = Arc::new(DownBackend {
            adds: AtomicUsize::new(0),
            fail_get: false,
            fail_add: false,
        });
        let manager = manager_with(backend.clone());

        let result = manager
            .get_or_cache(|| async { "x".to_string() }, &bases(), &[])
            .await
            .unwrap();
        assert!(!result.is_hit());
        assert_eq!(result.data(), "x");
        assert_eq!(result.status(), CacheStatus::Miss);
        assert_eq!(backend.adds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_recorded() {
        let backend = Arc::new(DownBackend {
            adds: AtomicUsize::new(0),
            fail_get: false,
            fail_add: true,
        });
        let manager = manager_with(backend.clone());
        let calls = AtomicUsize::new(0);

        let result = manager
            .get_or_cache(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "x".to_string()
                },
                &bases(),
                &[],
            )
            .await
            .unwrap();
        assert_eq!(result.data(), "x");
        assert_eq!(result.status(), CacheStatus::Error);
        assert_eq!(
            result.error(),
            Some(&CacheError::Add("connection reset".into()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.adds.load(Ordering::SeqCst), 1);
    }
}
