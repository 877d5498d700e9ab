//! Version counters and version-stamped keys.
//!
//! This crate provides:
//! - `KeyVersioner` - Counter store keyed by identity, with in-memory and master-version variants
//! - `CounterStore` - Narrow string counter interface the master-version variant runs on
//! - `Versioner` - Identity inspection plus counters, producing `identity:v=N` keys
//! - `ChangeTracker` - Collects entity changes and increments versions after commit

mod key_versioner;
mod master;
mod store;
mod tracker;
mod versioner;

pub use key_versioner::*;
pub use master::*;
pub use store::*;
pub use tracker::*;
pub use versioner::*;
