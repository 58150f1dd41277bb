//! Abstract client response.
//!
//! The body stays the engine's stream: the caller reads directly from the
//! transport, nothing is buffered on the way.

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Response, StatusCode};
use bytes::Bytes;

/// A response as handed back to the client framework.
#[derive(Debug)]
pub struct ClientResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl ClientResponse {
    /// Translate an engine response, copying every header value in order.
    pub fn from_engine(response: Response<Body>) -> Self {
        let (parts, body) = response.into_parts();

        let mut headers = HeaderMap::with_capacity(parts.headers.len());
        for (name, value) in parts.headers.iter() {
            headers.append(name.clone(), value.clone());
        }

        Self {
            status: parts.status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Standard reason phrase, empty for unregistered codes.
    pub fn reason_phrase(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// Read the whole body, failing past `limit` bytes.
    pub async fn bytes(self, limit: usize) -> Result<Bytes, axum::Error> {
        to_bytes(self.body, limit).await
    }

    pub async fn text(self, limit: usize) -> Result<String, axum::Error> {
        let bytes = self.bytes(limit).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
