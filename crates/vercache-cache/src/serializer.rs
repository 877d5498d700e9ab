//! Payload codecs.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use vercache_core::CacheError;

/// Encodes and decodes cached payloads.
pub trait Serializer<T>: Send + Sync {
    /// Name written into every encoded payload.
    fn name(&self) -> &str;

    /// Encode a payload.
    fn serialize(&self, value: &T) -> Result<Vec<u8>, CacheError>;

    /// Decode a payload.
    fn deserialize(&self, raw: &[u8]) -> Result<T, CacheError>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    payload: serde_json::Value,
}

/// JSON codec writing `{"type": <name>, "payload": <value>}`.
///
/// Payloads written under another name are rejected on read.
pub struct JsonSerializer<T> {
    name: String,
    _payload: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    /// Create a serializer with the default name `json`.
    pub fn new() -> Self {
        Self::named("json")
    }

    /// Create a serializer with a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _payload: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSerializer")
            .field("name", &self.name)
            .finish()
    }
}

impl<T> Serializer<T> for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn serialize(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        let envelope = EnvelopeRef {
            kind: &self.name,
            payload: value,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    fn deserialize(&self, raw: &[u8]) -> Result<T, CacheError> {
        let envelope: Envelope = serde_json::from_slice(raw)
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        if envelope.kind != self.name {
            return Err(CacheError::Deserialization(format!(
                "payload of type '{}' read by serializer '{}'",
                envelope.kind, self.name
            )));
        }
        serde_json::from_value(envelope.payload)
            .map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}
