//! Asynchronous HTTP engine capability.
//!
//! # Data Flow
//! ```text
//! health monitor / connector
//!     → EngineRequest (method, uri, headers, lazy body, optional timeout)
//!     → HttpEngine::send (awaited in place, or spawned for async dispatch)
//!     → Response<Body> (status, headers, streamed body)
//! ```
//!
//! # Design Decisions
//! - The engine is a black box behind an object-safe trait so monitors and
//!   connectors can share one `Arc<dyn HttpEngine>` and tests can script it
//! - Bodies stay streams in both directions; nothing here buffers
//! - The only per-call knob is the timeout

pub mod hyper_engine;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Response, Uri};
use std::time::Duration;
use thiserror::Error;

pub use hyper_engine::{HyperEngine, PinnedResolver};

/// Boxed error type used for transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by an engine while sending a request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No response head arrived within the request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, protocol or body failure.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The exchange was cancelled before it completed.
    #[error("request was cancelled")]
    Cancelled,

    /// The request could not be turned into a wire request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// A request as the engine sees it.
#[derive(Debug)]
pub struct EngineRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Pulled lazily once the exchange starts.
    pub body: Body,
    pub timeout: Option<Duration>,
}

impl EngineRequest {
    /// Create a request with an empty body and no timeout.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Body::empty(),
            timeout: None,
        }
    }

    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Split into the wire request and the timeout to enforce around it.
    pub fn into_http(self) -> Result<(Request<Body>, Option<Duration>), EngineError> {
        let mut request = Request::builder()
            .method(self.method)
            .uri(self.uri)
            .body(self.body)
            .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;
        *request.headers_mut() = self.headers;
        Ok((request, self.timeout))
    }
}

/// An HTTP engine able to carry out one exchange.
///
/// `send` completes once the response head is available; the body is
/// streamed afterwards through the returned `Body`. Asynchronous dispatch is
/// `tokio::spawn` around `send`.
#[async_trait]
pub trait HttpEngine: Send + Sync + 'static {
    async fn send(&self, request: EngineRequest) -> Result<Response<Body>, EngineError>;
}
