//! Cache status headers.

use http::header::{HeaderName, HeaderValue, ETAG};
use http::Response;

use vercache_cache::CacheStatus;

/// Header names set on cached views.
pub mod header_names {
    /// Cache outcome (HIT, MISS, DISABLED, ERROR).
    pub const X_VIEW_CACHE: &str = "x-view-cache";
}

/// Headers describing how a response was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeaders {
    /// Cache outcome.
    pub status: CacheStatus,
    /// Digest of the cache key, on hits and misses.
    pub etag: Option<String>,
}

impl CacheHeaders {
    /// Headers for an outcome without a key.
    pub fn new(status: CacheStatus) -> Self {
        Self { status, etag: None }
    }

    /// Set the ETag from a key digest.
    pub fn with_etag(mut self, digest: impl Into<String>) -> Self {
        self.etag = Some(digest.into());
        self
    }

    /// Write the headers into a response, replacing earlier values.
    pub fn apply<B>(&self, response: &mut Response<B>) {
        let headers = response.headers_mut();
        headers.insert(
            HeaderName::from_static(header_names::X_VIEW_CACHE),
            HeaderValue::from_static(self.status.as_str()),
        );
        if let Some(etag) = &self.etag {
            if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
                headers.insert(ETAG, value);
            }
        }
    }
}
