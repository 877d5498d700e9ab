//! Redis-backed stores.
//!
//! This crate provides:
//! - `RedisCacheBackend` - Payload store using `SET NX EX`
//! - `RedisCounterStore` - Counter store for the master-version key versioner

mod backend;
mod connect;
mod counter;

pub use backend::*;
pub use connect::*;
pub use counter::*;
