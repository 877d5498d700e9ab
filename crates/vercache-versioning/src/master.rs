//! Key versioner guarded by a master version.
//!
//! Every batched read also fetches the master version stored under
//! [`MASTER_VERSION_KEY`]. A store that was flushed or replaced loses its master
//! version; a fresh one is installed on the next read and, since the master version is
//! part of every cache key, everything cached against the old counters becomes
//! unreachable. Setting the master version to [`DISABLED_SENTINEL`] switches caching off
//! while counters keep tracking changes.

use async_trait::async_trait;
use tracing::{debug, info};

use vercache_core::{
    Identity, Version, VersionError, DEFAULT_VERSION, DISABLED_SENTINEL, MASTER_VERSION_KEY,
};

use crate::key_versioner::{KeyVersioner, VersionBatch};
use crate::store::CounterStore;

/// State of the master version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterState {
    /// Caching enabled at this master version.
    Enabled(Version),
    /// Caching switched off.
    Disabled,
    /// No master version installed yet.
    Missing,
}

impl std::fmt::Display for MasterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled(v) => write!(f, "enabled (master version {})", v),
            Self::Disabled => write!(f, "disabled"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Production key versioner over a shared [`CounterStore`].
#[derive(Debug)]
pub struct MasterVersionKeyVersioner<S: CounterStore> {
    store: S,
}

impl<S: CounterStore> MasterVersionKeyVersioner<S> {
    /// Create a versioner over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the master version state.
    pub async fn status(&self) -> Result<MasterState, VersionError> {
        let raw = self.read_master().await?;
        match raw {
            None => Ok(MasterState::Missing),
            Some(value) if value == DISABLED_SENTINEL => Ok(MasterState::Disabled),
            Some(value) => parse_version(MASTER_VERSION_KEY, &value).map(MasterState::Enabled),
        }
    }

    /// Switch caching off store-wide.
    pub async fn disable(&self) -> Result<(), VersionError> {
        self.store
            .set(MASTER_VERSION_KEY, DISABLED_SENTINEL)
            .await
            .map_err(|e| VersionError::MasterVersion(e.to_string()))?;
        info!("caching disabled through master version");
        Ok(())
    }

    /// Switch caching back on with a fresh master version.
    ///
    /// Does nothing when caching is already enabled.
    pub async fn enable(&self) -> Result<MasterState, VersionError> {
        match self.status().await? {
            MasterState::Enabled(v) => Ok(MasterState::Enabled(v)),
            MasterState::Disabled | MasterState::Missing => {
                let version = fresh_master_version(None);
                self.write_master(version).await?;
                info!(master = version, "caching enabled through master version");
                Ok(MasterState::Enabled(version))
            }
        }
    }

    /// Install a new master version, invalidating every cache key at once.
    ///
    /// A disabled store stays disabled and yields [`VersionError::CacheDisabled`];
    /// use [`MasterVersionKeyVersioner::enable`] to switch caching back on.
    pub async fn invalidate_all(&self) -> Result<Version, VersionError> {
        let current = match self.status().await? {
            MasterState::Enabled(v) => Some(v),
            MasterState::Disabled => return Err(VersionError::CacheDisabled),
            MasterState::Missing => None,
        };
        let version = fresh_master_version(current);
        self.write_master(version).await?;
        info!(master = version, "installed new master version");
        Ok(version)
    }

    async fn read_master(&self) -> Result<Option<String>, VersionError> {
        let mut values = self
            .store
            .mget(&[MASTER_VERSION_KEY.to_string()])
            .await
            .map_err(|e| VersionError::Get(e.to_string()))?;
        Ok(values.pop().flatten())
    }

    async fn write_master(&self, version: Version) -> Result<(), VersionError> {
        self.store
            .set(MASTER_VERSION_KEY, &version.to_string())
            .await
            .map_err(|e| VersionError::MasterVersion(e.to_string()))
    }

    async fn fetch(&self, request: &[String]) -> Result<Vec<Option<String>>, VersionError> {
        let values = self
            .store
            .mget(request)
            .await
            .map_err(|e| VersionError::Get(e.to_string()))?;
        if values.len() != request.len() {
            return Err(VersionError::Get(format!(
                "expected {} values, store returned {}",
                request.len(),
                values.len()
            )));
        }
        Ok(values)
    }
}

#[async_trait]
impl<S: CounterStore> KeyVersioner for MasterVersionKeyVersioner<S> {
    async fn get_multi(&self, keys: &[Identity]) -> Result<VersionBatch, VersionError> {
        let mut request = Vec::with_capacity(keys.len() + 1);
        request.push(MASTER_VERSION_KEY.to_string());
        request.extend(keys.iter().map(|k| k.as_str().to_string()));

        let mut values = self.fetch(&request).await?;

        if values[0].is_none() {
            let version = fresh_master_version(None);
            let installed = self
                .store
                .set_nx(MASTER_VERSION_KEY, &version.to_string())
                .await
                .map_err(|e| VersionError::MasterVersion(e.to_string()))?;
            debug!(master = version, installed, "master version was absent");
            values = self.fetch(&request).await?;
        }

        let mut values = values.into_iter();
        let master = values.next().flatten().ok_or_else(|| {
            VersionError::MasterVersion("master version absent after install".to_string())
        })?;
        if master == DISABLED_SENTINEL {
            return Err(VersionError::CacheDisabled);
        }
        let master = parse_version(MASTER_VERSION_KEY, &master)?;

        let versions = keys
            .iter()
            .zip(values)
            .map(|(key, value)| match value {
                Some(raw) => parse_version(key.as_str(), &raw),
                None => Ok(DEFAULT_VERSION),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionBatch::new(versions).with_master(master))
    }

    async fn incr(&self, key: &Identity) -> Result<(), VersionError> {
        self.store
            .incr(key.as_str())
            .await
            .map(|_| ())
            .map_err(|e| VersionError::Increment {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn flush_all(&self) -> Result<(), VersionError> {
        self.store
            .flush_all()
            .await
            .map_err(|e| VersionError::Flush(e.to_string()))
    }
}

fn parse_version(key: &str, raw: &str) -> Result<Version, VersionError> {
    raw.parse::<Version>()
        .map_err(|_| VersionError::Get(format!("version of '{}' is not a number: {:?}", key, raw)))
}

/// Current time in milliseconds, strictly above `current` when given.
fn fresh_master_version(current: Option<Version>) -> Version {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    match current {
        Some(current) if current >= now => current + 1,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryCounterStore, StoreError};

    fn versioner() -> MasterVersionKeyVersioner<MemoryCounterStore> {
        MasterVersionKeyVersioner::new(MemoryCounterStore::new())
    }

    #[tokio::test]
    async fn test_master_is_installed_on_first_read() {
        let kv = versioner();
        assert_eq!(kv.status().await.unwrap(), MasterState::Missing);

        let batch = kv.get_multi(&["user:id=1".into()]).await.unwrap();
        assert_eq!(batch.versions, vec![0]);
        let master = batch.master.unwrap();
        assert!(master > 0);

        let again = kv.get_multi(&["user:id=1".into()]).await.unwrap();
        assert_eq!(again.master, Some(master));
        assert_eq!(kv.status().await.unwrap(), MasterState::Enabled(master));
    }

    #[tokio::test]
    async fn test_increments_and_defaults() {
        let kv = versioner();
        kv.incr(&"a".into()).await.unwrap();
        kv.incr(&"a".into()).await.unwrap();

        let batch = kv.get_multi(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(batch.versions, vec![2, 0]);
        assert_eq!(kv.get(&"a".into()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_disable_and_enable_keep_counters() {
        let kv = versioner();
        kv.incr(&"user:id=1".into()).await.unwrap();
        let before = kv.get_multi(&["user:id=1".into()]).await.unwrap();

        kv.disable().await.unwrap();
        assert_eq!(kv.status().await.unwrap(), MasterState::Disabled);
        assert_eq!(
            kv.get_multi(&["user:id=1".into()]).await.unwrap_err(),
            VersionError::CacheDisabled
        );
        // Counters keep tracking while disabled.
        kv.incr(&"user:id=2".into()).await.unwrap();

        let state = kv.enable().await.unwrap();
        assert!(matches!(state, MasterState::Enabled(_)));
        let after = kv
            .get_multi(&["user:id=1".into(), "user:id=2".into()])
            .await
            .unwrap();
        assert_eq!(after.versions, vec![before.versions[0], 1]);
    }

    #[tokio::test]
    async fn test_enable_when_enabled_is_a_no_op() {
        let kv = versioner();
        let master = kv.get_multi(&[]).await.unwrap().master.unwrap();
        assert_eq!(kv.enable().await.unwrap(), MasterState::Enabled(master));
    }

    #[tokio::test]
    async fn test_invalidate_all_changes_master() {
        let kv = versioner();
        let master = kv.get_multi(&[]).await.unwrap().master.unwrap();
        let fresh = kv.invalidate_all().await.unwrap();
        assert!(fresh > master);
        assert_eq!(kv.get_multi(&[]).await.unwrap().master, Some(fresh));
    }

    #[tokio::test]
    async fn test_invalidate_all_keeps_caching_disabled() {
        let kv = versioner();
        kv.get_multi(&[]).await.unwrap();
        kv.disable().await.unwrap();

        assert_eq!(kv.invalidate_all().await.unwrap_err(), VersionError::CacheDisabled);
        assert_eq!(kv.status().await.unwrap(), MasterState::Disabled);
    }

    #[tokio::test]
    async fn test_flush_resets_master_and_counters() {
        let kv = versioner();
        kv.incr(&"a".into()).await.unwrap();
        kv.get_multi(&[]).await.unwrap();

        kv.flush_all().await.unwrap();
        assert_eq!(kv.status().await.unwrap(), MasterState::Missing);
        let batch = kv.get_multi(&["a".into()]).await.unwrap();
        assert_eq!(batch.versions, vec![0]);
        assert!(batch.master.is_some());
    }

    #[tokio::test]
    async fn test_garbage_version_is_an_error() {
        let kv = versioner();
        kv.store().set("a", "not-a-number").await.unwrap();
        assert!(matches!(
            kv.get_multi(&["a".into()]).await.unwrap_err(),
            VersionError::Get(_)
        ));
    }

    /// A store that never keeps the master version.
    struct ForgetfulStore;

    #[async_trait]
    impl CounterStore for ForgetfulStore {
        async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
            Ok(vec![None; keys.len()])
        }
        async fn incr(&self, _key: &str) -> Result<i64, StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
        async fn set_nx(&self, _key: &str, _value: &str) -> Result<bool, StoreError> {
            Ok(true)
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn flush_all(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unusable_store_errors() {
        let kv = MasterVersionKeyVersioner::new(ForgetfulStore);
        assert!(matches!(
            kv.get_multi(&["a".into()]).await.unwrap_err(),
            VersionError::MasterVersion(_)
        ));
        assert!(matches!(
            kv.incr(&"a".into()).await.unwrap_err(),
            VersionError::Increment { .. }
        ));
    }
}
