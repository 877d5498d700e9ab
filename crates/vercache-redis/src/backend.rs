//! Redis payload store.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use vercache_cache::CacheBackend;
use vercache_core::{CacheError, CachingConfig, DEFAULT_EXPIRATION_SECS};

use crate::connect::{configured_uri, connect, ConnectError};

/// Payload store writing with `SET key value EX <expiration> NX`.
///
/// Entries expire after the configured expiration; obsolete keys are never deleted
/// explicitly.
#[derive(Clone)]
pub struct RedisCacheBackend {
    connection: MultiplexedConnection,
    expiration: Duration,
}

impl RedisCacheBackend {
    /// Wrap an open connection.
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self {
            connection,
            expiration: Duration::from_secs(DEFAULT_EXPIRATION_SECS),
        }
    }

    /// Connect to `uri`.
    pub async fn connect(uri: &str) -> Result<Self, ConnectError> {
        Ok(Self::new(connect(uri).await?))
    }

    /// Connect to the configured cache store, expiring entries after
    /// [`CachingConfig::default_expiration_secs`].
    pub async fn from_config(config: &CachingConfig) -> Result<Self, ConnectError> {
        let uri = configured_uri(&config.cache_store, "cache store")?;
        Ok(Self::connect(uri)
            .await?
            .with_expiration(Duration::from_secs(config.default_expiration_secs)))
    }

    /// Set the expiration of new entries (at least one second).
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration.max(Duration::from_secs(1));
        self
    }

    /// Expiration of new entries.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut con = self.connection.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut con)
            .await
            .map_err(|e| CacheError::Get(e.to_string()))?;
        Ok(value)
    }

    async fn add(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(self.expiration.as_secs())
            .arg("NX")
            .query_async(&mut con)
            .await
            .map_err(|e| CacheError::Add(e.to_string()))?;

        match reply {
            Some(_) => Ok(()),
            None => Err(CacheError::KeyAlreadyExists(key.to_string())),
        }
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut con)
            .await
            .map_err(|e| CacheError::Add(e.to_string()))?;
        Ok(())
    }
}
