//! Cache key composition.
//!
//! A [`CacheKey`] is a static root naming the computation followed by the versioned keys
//! of everything it depends on:
//!
//! ```text
//! <base1>:<base2>:...:<identity1>:v=<v1>:<identity2>:v=<v2>
//! ```

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use sha2::{Digest, Sha256};

use crate::version::VersionedKey;

/// Delimiter between key segments.
pub const KEY_DELIMITER: &str = ":";

/// One base of a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart {
    /// A literal segment.
    Text(String),
    /// Segments rendered in order.
    List(Vec<String>),
    /// Multi-valued parameters, rendered `name=v1,v2` in name order.
    ///
    /// Names and values are percent-encoded, so `:`, `,`, `=` and `%` inside them
    /// never read as delimiters.
    Map(BTreeMap<String, Vec<String>>),
}

impl KeyPart {
    /// Render this part as it appears in the key.
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(KEY_DELIMITER),
            Self::Map(map) => map
                .iter()
                .map(|(k, values)| {
                    let values = values
                        .iter()
                        .map(|v| urlencoding::encode(v))
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("{}={}", urlencoding::encode(k), values)
                })
                .collect::<Vec<_>>()
                .join(KEY_DELIMITER),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for KeyPart {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Vec<String>>> for KeyPart {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self::Map(map)
    }
}

/// A cache key uniquely identifying a cached result.
///
/// Equality and hashing follow [`CacheKey::key`].
#[derive(Debug, Clone)]
pub struct CacheKey {
    bases: Vec<KeyPart>,
    dependencies: Vec<VersionedKey>,
}

impl CacheKey {
    /// Create a cache key from bases and versioned dependencies.
    pub fn new(bases: Vec<KeyPart>, dependencies: Vec<VersionedKey>) -> Self {
        Self {
            bases,
            dependencies,
        }
    }

    /// The bases naming the computation.
    pub fn bases(&self) -> &[KeyPart] {
        &self.bases
    }

    /// The versioned dependencies, in order.
    pub fn dependencies(&self) -> &[VersionedKey] {
        &self.dependencies
    }

    /// The rendered bases, without any version information.
    pub fn root(&self) -> String {
        self.bases
            .iter()
            .map(KeyPart::render)
            .collect::<Vec<_>>()
            .join(KEY_DELIMITER)
    }

    /// The full key: root, delimiter, then the joined dependencies.
    pub fn key(&self) -> String {
        let deps = self
            .dependencies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(KEY_DELIMITER);
        format!("{}{}{}", self.root(), KEY_DELIMITER, deps)
    }

    /// Hex SHA-256 digest of the full key, usable as an ETag.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.key().as_bytes()))
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}
