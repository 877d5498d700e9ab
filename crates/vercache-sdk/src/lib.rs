//! Public SDK for version-stamped dependency caching.
//!
//! This crate re-exports every vercache crate:
//!
//! ```ignore
//! use vercache_sdk::prelude::*;
//!
//! let store = RedisCounterStore::connect("redis://localhost:6379/0").await?;
//! let versioner = Arc::new(Versioner::with_default_inspector(Arc::new(store.into_versioner())));
//! let backend = RedisCacheBackend::connect("redis://localhost:6379/1").await?;
//! let manager = CacheManager::new(versioner.clone(), Arc::new(backend), Arc::new(ResponseSerializer::new()));
//!
//! let view = CachedView::new(ArticleDetail, manager)
//!     .depends_on(RouteDependency::of::<Article>([("article_id", "id")]));
//!
//! // After saving an article:
//! let mut tracker = versioner.tracker();
//! tracker.updated(&article);
//! tracker.after_commit(&versioner).await;
//! ```

pub use vercache_cache;
pub use vercache_core;
pub use vercache_http;
pub use vercache_observability;
pub use vercache_redis;
pub use vercache_versioning;

/// Prelude for convenient imports.
pub mod prelude {
    pub use vercache_cache::*;
    pub use vercache_core::*;
    pub use vercache_http::*;
    pub use vercache_observability::*;
    pub use vercache_redis::*;
    pub use vercache_versioning::*;
}
