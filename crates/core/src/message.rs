//! Request and response snapshots exchanged between the interceptor,
//! the network and the cache stores.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// An outgoing request observed by the worker.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: None }
    }

    /// A bodyless GET request, the only kind the cache stores hold.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

/// A captured response: status, headers and the complete body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// URL the response was served from (after redirects).
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(url: Url, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { url, status, headers: HeaderMap::new(), body: body.into() }
    }

    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Stored form of one header value: text when it is valid UTF-8, raw bytes
/// otherwise (obs-text).
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Text(String),
    Bytes(Vec<u8>),
}

/// Serialize headers as a JSON list of `[name, value]` pairs.
pub fn headers_to_json(headers: &HeaderMap) -> Result<String, Error> {
    let pairs: Vec<(&str, StoredValue)> = headers
        .iter()
        .map(|(name, value)| {
            let stored = match std::str::from_utf8(value.as_bytes()) {
                Ok(text) => StoredValue::Text(text.to_string()),
                Err(_) => StoredValue::Bytes(value.as_bytes().to_vec()),
            };
            (name.as_str(), stored)
        })
        .collect();
    serde_json::to_string(&pairs).map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))
}

/// Parse headers previously written by [`headers_to_json`].
pub fn headers_from_json(json: &str) -> Result<HeaderMap, Error> {
    let pairs: Vec<(String, StoredValue)> =
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("malformed headers: {e}")))?;

    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("malformed header name {name}: {e}")))?;
        let value = match value {
            StoredValue::Text(text) => HeaderValue::from_str(&text),
            StoredValue::Bytes(raw) => HeaderValue::from_bytes(&raw),
        }
        .map_err(|e| Error::InvalidInput(format!("malformed header value: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}
