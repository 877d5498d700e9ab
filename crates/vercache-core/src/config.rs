//! Caching configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding [`CachingConfig::enabled`].
pub const ENV_CACHING_ENABLED: &str = "CACHING_ENABLED";

/// Environment variable overriding the cache store URI.
pub const ENV_CACHE_STORE_URI: &str = "CACHE_STORE_REDIS_URI";

/// Environment variable overriding the version store URI.
pub const ENV_VERSION_STORE_URI: &str = "VERSION_STORE_REDIS_URI";

/// Default expiration of cached payloads: 7 days.
pub const DEFAULT_EXPIRATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid boolean for {name}: {value:?}")]
    InvalidBool { name: String, value: String },
}

/// Location of a Redis-backed store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis URI, e.g. `redis://localhost:6379/0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Caching configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachingConfig {
    /// Global caching switch.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Payload store.
    #[serde(default)]
    pub cache_store: StoreConfig,

    /// Version counter store.
    #[serde(default)]
    pub version_store: StoreConfig,

    /// Expiration of cached payloads, in seconds.
    #[serde(default = "default_expiration")]
    pub default_expiration_secs: u64,

    /// Maximum number of entries kept by the in-memory cache backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_capacity: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_expiration() -> u64 {
    DEFAULT_EXPIRATION_SECS
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_store: StoreConfig::default(),
            version_store: StoreConfig::default(),
            default_expiration_secs: DEFAULT_EXPIRATION_SECS,
            memory_capacity: None,
        }
    }
}

impl CachingConfig {
    /// Load config from a TOML file, or JSON when the path ends in `.json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                reason: e.to_string(),
            })
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                reason: e.to_string(),
            })
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CACHING_ENABLED) {
            self.enabled = parse_bool(&value).ok_or_else(|| ConfigError::InvalidBool {
                name: ENV_CACHING_ENABLED.to_string(),
                value,
            })?;
        }
        if let Some(uri) = lookup(ENV_CACHE_STORE_URI) {
            self.cache_store.uri = Some(uri);
        }
        if let Some(uri) = lookup(ENV_VERSION_STORE_URI) {
            self.version_store.uri = Some(uri);
        }
        Ok(self)
    }

    /// Set the caching switch.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the in-memory backend capacity.
    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = Some(capacity);
        self
    }
}

/// Parse a boolean word, case-insensitively.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "y" | "t" | "1" => Some(true),
        "false" | "no" | "off" | "n" | "f" | "0" => Some(false),
        _ => None,
    }
}
