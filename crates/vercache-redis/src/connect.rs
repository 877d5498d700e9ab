//! Connection setup.

use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tracing::debug;

use vercache_core::StoreConfig;

/// Failure to reach a Redis server.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid redis uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("failed to connect to redis: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("no redis uri configured for the {0}")]
    NotConfigured(&'static str),
}

/// Open one multiplexed connection, shared by every clone.
pub async fn connect(uri: &str) -> Result<MultiplexedConnection, ConnectError> {
    let client = redis::Client::open(uri).map_err(|e| ConnectError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    let connection = client.get_multiplexed_async_connection().await?;
    debug!(uri, "connected to redis");
    Ok(connection)
}

/// The configured uri of a store, or [`ConnectError::NotConfigured`].
pub(crate) fn configured_uri<'a>(
    store: &'a StoreConfig,
    name: &'static str,
) -> Result<&'a str, ConnectError> {
    store.uri.as_deref().ok_or(ConnectError::NotConfigured(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_uri() {
        let err = connect("not a redis uri").await.unwrap_err();
        assert!(matches!(err, ConnectError::InvalidUri { .. }));
    }

    #[test]
    fn test_missing_uri() {
        let err = configured_uri(&StoreConfig::default(), "cache store").unwrap_err();
        assert!(matches!(err, ConnectError::NotConfigured("cache store")));
        assert_eq!(err.to_string(), "no redis uri configured for the cache store");

        let store = StoreConfig {
            uri: Some("redis://localhost/2".into()),
        };
        assert_eq!(configured_uri(&store, "cache store").unwrap(), "redis://localhost/2");
    }
}
