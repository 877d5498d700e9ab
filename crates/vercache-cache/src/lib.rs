//! Compute-or-fetch caching under version-stamped keys.
//!
//! This crate provides:
//! - `CacheManager` - Builds keys from dependencies, fetches or computes, emits events
//! - `CacheBackend` - Create-only payload store, with an in-memory implementation
//! - `Serializer` - Payload codec, with a JSON implementation
//! - `EventSink` - Receivers of hit/miss events

mod backend;
mod events;
mod manager;
mod result;
mod serializer;

pub use backend::*;
pub use events::*;
pub use manager::*;
pub use result::*;
pub use serializer::*;
