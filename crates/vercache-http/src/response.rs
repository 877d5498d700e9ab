//! Codec for cached HTTP responses.

use http::{HeaderName, HeaderValue, Response, StatusCode};
use serde::{Deserialize, Serialize};

use vercache_cache::{JsonSerializer, Serializer};
use vercache_core::CacheError;

/// Serializer name written into stored responses.
pub const RESPONSE_SERIALIZER_NAME: &str = "http.response";

#[derive(Debug, Serialize, Deserialize)]
struct StoredResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

/// Stores the status, headers and body of an `http::Response<String>`.
#[derive(Debug)]
pub struct ResponseSerializer {
    inner: JsonSerializer<StoredResponse>,
}

impl ResponseSerializer {
    /// Create a response serializer.
    pub fn new() -> Self {
        Self {
            inner: JsonSerializer::named(RESPONSE_SERIALIZER_NAME),
        }
    }
}

impl Default for ResponseSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<Response<String>> for ResponseSerializer {
    fn name(&self) -> &str {
        RESPONSE_SERIALIZER_NAME
    }

    fn serialize(&self, value: &Response<String>) -> Result<Vec<u8>, CacheError> {
        let headers = value
            .headers()
            .iter()
            .map(|(name, value)| {
                value
                    .to_str()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
                    .map_err(|_| {
                        CacheError::Serialization(format!("header '{}' is not valid text", name))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.inner.serialize(&StoredResponse {
            status: value.status().as_u16(),
            headers,
            body: value.body().clone(),
        })
    }

    fn deserialize(&self, raw: &[u8]) -> Result<Response<String>, CacheError> {
        let stored = self.inner.deserialize(raw)?;

        let mut response = Response::new(stored.body);
        *response.status_mut() = StatusCode::from_u16(stored.status)
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;

        let headers = response.headers_mut();
        for (name, value) in stored.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| CacheError::Deserialization(e.to_string()))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| CacheError::Deserialization(e.to_string()))?;
            headers.append(name, value);
        }
        Ok(response)
    }
}
