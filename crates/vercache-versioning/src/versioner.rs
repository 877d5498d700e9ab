//! Version-stamped keys for dependencies.

use std::sync::Arc;

use tracing::debug;

use vercache_core::{
    DefaultIdentityInspector, Identity, IdentityError, IdentityInspector, Result, Thing,
    VersionError, VersionedKey, MASTER_VERSION_KEY,
};

use crate::key_versioner::KeyVersioner;
use crate::tracker::ChangeTracker;

/// Versioned keys for a dependency list, read in one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyKeys {
    /// `cache:v=<master>` when the key versioner maintains a master version.
    pub master: Option<VersionedKey>,
    /// One key per dependency, in order.
    pub keys: Vec<VersionedKey>,
}

impl DependencyKeys {
    /// All keys as they go into a cache key, master version first.
    pub fn into_dependencies(self) -> Vec<VersionedKey> {
        self.master.into_iter().chain(self.keys).collect()
    }
}

/// Combines an identity inspector and a key versioner.
#[derive(Clone)]
pub struct Versioner {
    key_versioner: Arc<dyn KeyVersioner>,
    inspector: Arc<dyn IdentityInspector>,
}

impl Versioner {
    /// Create a versioner from its two collaborators.
    pub fn new(key_versioner: Arc<dyn KeyVersioner>, inspector: Arc<dyn IdentityInspector>) -> Self {
        Self {
            key_versioner,
            inspector,
        }
    }

    /// Create a versioner using the standard identity formats.
    pub fn with_default_inspector(key_versioner: Arc<dyn KeyVersioner>) -> Self {
        Self::new(key_versioner, Arc::new(DefaultIdentityInspector))
    }

    /// The key versioner.
    pub fn key_versioner(&self) -> &Arc<dyn KeyVersioner> {
        &self.key_versioner
    }

    /// The identity inspector.
    pub fn inspector(&self) -> &Arc<dyn IdentityInspector> {
        &self.inspector
    }

    /// Identify a thing without reading its version.
    pub fn identify(&self, thing: &Thing) -> std::result::Result<Identity, IdentityError> {
        self.inspector.identify(thing)
    }

    /// Versioned key of a single thing.
    pub async fn get_key(&self, thing: &Thing) -> Result<VersionedKey> {
        let mut keys = self.get_multi_keys(std::slice::from_ref(thing)).await?;
        keys.pop()
            .ok_or_else(|| VersionError::Get("no version returned".to_string()).into())
    }

    /// Versioned keys of many things, in order, read in one batched call.
    pub async fn get_multi_keys(&self, things: &[Thing]) -> Result<Vec<VersionedKey>> {
        Ok(self.snapshot(things).await?.keys)
    }

    /// Versioned keys of many things plus the master version, in one batched call.
    pub async fn snapshot(&self, things: &[Thing]) -> Result<DependencyKeys> {
        let identities = things
            .iter()
            .map(|thing| self.inspector.identify(thing))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let batch = self.key_versioner.get_multi(&identities).await?;
        if batch.versions.len() != identities.len() {
            return Err(VersionError::Get(format!(
                "expected {} versions, got {}",
                identities.len(),
                batch.versions.len()
            ))
            .into());
        }

        let keys = identities
            .into_iter()
            .zip(batch.versions)
            .map(|(identity, version)| identity.versioned(version))
            .collect();
        let master = batch
            .master
            .map(|version| Identity::new(MASTER_VERSION_KEY).versioned(version));

        Ok(DependencyKeys { master, keys })
    }

    /// Increment the version of a thing.
    ///
    /// For a single row this also increments its table, so listings including the row
    /// are invalidated together with it.
    pub async fn incr(&self, thing: &Thing) -> Result<()> {
        let identity = self.inspector.identify(thing)?;
        self.incr_identity(&identity).await?;

        if thing.is_instance() {
            if let Some(class) = thing.owning_class() {
                let class_identity = self.inspector.identify(&class)?;
                self.incr_identity(&class_identity).await?;
            }
        }
        Ok(())
    }

    /// Increment exactly one identity.
    pub async fn incr_identity(&self, identity: &Identity) -> std::result::Result<(), VersionError> {
        debug!(identity = %identity, "incrementing version");
        self.key_versioner.incr(identity).await
    }

    /// Start collecting changes for one unit of work.
    pub fn tracker(&self) -> ChangeTracker {
        ChangeTracker::new(self.inspector.clone())
    }
}

impl std::fmt::Debug for Versioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Versioner").finish_non_exhaustive()
    }
}
