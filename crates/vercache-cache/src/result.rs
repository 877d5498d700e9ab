//! Lookup results.

use serde::{Deserialize, Serialize};

use vercache_core::{CacheError, CacheKey};

/// Cache outcome as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the cache.
    Hit,
    /// Computed and stored.
    Miss,
    /// Caching switched off.
    Disabled,
    /// Computed uncached after a cache failure.
    Error,
}

impl CacheStatus {
    /// Upper-case name, as sent in response headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Disabled => "DISABLED",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload with the key it was looked up under and whether it was a hit.
///
/// A miss whose payload could not be stored, or that replaced an unreadable stored
/// payload, carries the cache error and reports [`CacheStatus::Error`].
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
    key: CacheKey,
    data: T,
    hit: bool,
    error: Option<CacheError>,
}

impl<T> CacheResult<T> {
    /// A payload served from the cache.
    pub fn hit(key: CacheKey, data: T) -> Self {
        Self {
            key,
            data,
            hit: true,
            error: None,
        }
    }

    /// A freshly computed payload.
    pub fn miss(key: CacheKey, data: T) -> Self {
        Self {
            key,
            data,
            hit: false,
            error: None,
        }
    }

    /// Record a cache failure that did not prevent serving the payload.
    pub fn with_error(mut self, error: CacheError) -> Self {
        self.error = Some(error);
        self
    }

    /// The cache failure recorded for this lookup, if any.
    pub fn error(&self) -> Option<&CacheError> {
        self.error.as_ref()
    }

    /// Whether the payload came from the cache.
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    /// Hit, miss, or error when a cache failure was recorded.
    pub fn status(&self) -> CacheStatus {
        match (self.hit, &self.error) {
            (_, Some(_)) => CacheStatus::Error,
            (true, None) => CacheStatus::Hit,
            (false, None) => CacheStatus::Miss,
        }
    }

    /// The payload.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Take the payload.
    pub fn into_data(self) -> T {
        self.data
    }

    /// The key the payload is stored under.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Opaque digest of the key, suitable as an ETag.
    pub fn key_hash(&self) -> String {
        self.key.digest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        let key = CacheKey::new(vec!["mod".into()], Vec::new());
        let hit = CacheResult::hit(key.clone(), 1);
        let miss = CacheResult::miss(key.clone(), 1);

        assert!(hit.is_hit());
        assert_eq!(hit.status(), CacheStatus::Hit);
        assert!(!miss.is_hit());
        assert_eq!(miss.status().to_string(), "MISS");
        assert_eq!(hit.key_hash(), key.digest());
        assert_eq!(miss.into_data(), 1);
    }

    #[test]
    fn test_recorded_error_reports_error_status() {
        let key = CacheKey::new(vec!["mod".into()], Vec::new());
        let result = CacheResult::miss(key, "x").with_error(CacheError::Add("reset".into()));

        assert!(!result.is_hit());
        assert_eq!(result.status(), CacheStatus::Error);
        assert_eq!(result.error(), Some(&CacheError::Add("reset".into())));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CacheStatus::Disabled.to_string(), "DISABLED");
        assert_eq!(CacheStatus::Error.to_string(), "ERROR");
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
    }
}
