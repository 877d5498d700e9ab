//! Hit and miss counters per cache root.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use vercache_cache::{CacheEvent, CacheEventKind, EventSink};

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Counters of one cache root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootStats {
    /// Cache key root.
    pub root: String,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that computed.
    pub misses: u64,
}

impl RootStats {
    /// Share of lookups served from the cache, `None` before any lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        (total > 0).then(|| self.hits as f64 / total as f64)
    }
}

/// Per-root hit/miss counters, fed as an event sink.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    roots: DashMap<String, Counters>,
}

impl CacheMetrics {
    /// Create empty counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters of one root.
    pub fn stats(&self, root: &str) -> Option<RootStats> {
        self.roots.get(root).map(|c| RootStats {
            root: root.to_string(),
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
        })
    }

    /// Counters of every root, sorted by root.
    pub fn snapshot(&self) -> Vec<RootStats> {
        let mut stats: Vec<_> = self
            .roots
            .iter()
            .map(|entry| RootStats {
                root: entry.key().clone(),
                hits: entry.hits.load(Ordering::Relaxed),
                misses: entry.misses.load(Ordering::Relaxed),
            })
            .collect();
        stats.sort_by(|a, b| a.root.cmp(&b.root));
        stats
    }

    /// Snapshot as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Drop every counter.
    pub fn reset(&self) {
        self.roots.clear();
    }
}

impl EventSink for CacheMetrics {
    fn emit(&self, event: &CacheEvent) {
        let counters = self.roots.entry(event.root.clone()).or_default();
        let counter = match event.kind {
            CacheEventKind::Hit => &counters.hits,
            CacheEventKind::Miss => &counters.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
