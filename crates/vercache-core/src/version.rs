//! Identities, versions and version-stamped keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Version counter of an identity.
pub type Version = u64;

/// Version of every identity that was never incremented.
pub const DEFAULT_VERSION: Version = 0;

/// Counter key holding the master version of a shared version store.
pub const MASTER_VERSION_KEY: &str = "cache";

/// Master version value that switches caching off store-wide.
pub const DISABLED_SENTINEL: &str = "off";

/// Stable name of something that can change.
///
/// Identities never carry a version themselves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stamp this identity with a version.
    pub fn versioned(&self, version: Version) -> VersionedKey {
        VersionedKey::new(self.clone(), version)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An identity stamped with its current version: `<identity>:v=<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedKey {
    identity: Identity,
    version: Version,
}

impl VersionedKey {
    /// Create a versioned key.
    pub fn new(identity: Identity, version: Version) -> Self {
        Self { identity, version }
    }

    /// The identity part.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The version part.
    pub fn version(&self) -> Version {
        self.version
    }
}

impl fmt::Display for VersionedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:v={}", self.identity, self.version)
    }
}
