//! Redis counter store.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisError;

use vercache_core::CachingConfig;
use vercache_versioning::{CounterStore, MasterVersionKeyVersioner, StoreError};

use crate::connect::{configured_uri, connect, ConnectError};

/// Counter store over `MGET`, `INCR`, `SET` and `FLUSHDB`.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: MultiplexedConnection,
}

impl RedisCounterStore {
    /// Wrap an open connection.
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }

    /// Connect to `uri`.
    pub async fn connect(uri: &str) -> Result<Self, ConnectError> {
        Ok(Self::new(connect(uri).await?))
    }

    /// Connect to the configured version store.
    pub async fn from_config(config: &CachingConfig) -> Result<Self, ConnectError> {
        Self::connect(configured_uri(&config.version_store, "version store")?).await
    }

    /// A master-version key versioner over this store.
    pub fn into_versioner(self) -> MasterVersionKeyVersioner<Self> {
        MasterVersionKeyVersioner::new(self)
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

fn store_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut con = self.connection.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut con)
            .await
            .map_err(store_error)?;
        Ok(values)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut con = self.connection.clone();
        let value: i64 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut con)
            .await
            .map_err(|e| {
                if e.kind() == redis::ErrorKind::ResponseError {
                    StoreError::NotAnInteger(key.to_string())
                } else {
                    store_error(e)
                }
            })?;
        Ok(value)
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut con = self.connection.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .query_async(&mut con)
            .await
            .map_err(store_error)?;
        Ok(reply.is_some())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut con)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut con)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
