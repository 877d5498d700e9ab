//! Core abstractions for version-stamped caching.
//!
//! This crate provides the fundamental types:
//! - `Identity` / `VersionedKey` - Stable names of things that change, and their stamped form
//! - `Thing` / `Entity` - The shapes a dependency can take
//! - `IdentityInspector` - Maps a `Thing` to its `Identity`
//! - `CacheKey` - Static root plus versioned dependencies
//! - `CachingConfig` - Switches and store locations
//! - `RequestContext` - Typed request parameters used to resolve dependencies

mod config;
mod context;
mod error;
mod identity;
mod key;
mod version;

pub use config::*;
pub use context::*;
pub use error::*;
pub use identity::*;
pub use key::*;
pub use version::*;
