//! HTTP view integration for version-stamped caching.
//!
//! This crate provides:
//! - `View` / `CachedView` - Explicit wrapper caching a view's responses
//! - `DependencyResolver` - Route parameters and resource paths to dependency things
//! - `KeyModifier` - Request-dependent key bases, such as query strings
//! - `ResponseSerializer` - Codec for `http::Response<String>`

mod headers;
mod modifier;
mod resolve;
mod response;
mod view;

pub use headers::*;
pub use modifier::*;
pub use resolve::*;
pub use response::*;
pub use view::*;
