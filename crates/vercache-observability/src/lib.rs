//! Observability for version-stamped caching.
//!
//! This crate provides:
//! - `CacheMetrics` - Per-root hit/miss counters fed by cache events
//! - `TracingSink` - Cache events as structured log records
//! - `init_logging` - Subscriber setup in JSON or human format

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

pub use vercache_core::RequestId;
