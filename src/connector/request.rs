//! Abstract client request.
//!
//! # Responsibilities
//! - Carry method, URI, headers and configuration properties
//! - Hold an optional entity and the sink it is serialized into
//! - Extract the read timeout from the properties
//!
//! # Design Decisions
//! - Headers are a `HeaderMap`: order and multiplicity survive forwarding
//! - Properties are loosely typed (`serde_json::Value`); only a positive
//!   integer read timeout is honoured, anything else is ignored silently
//! - The entity writes into whatever sink the connector registers

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::{Map, Value};
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Property holding the read timeout in milliseconds.
pub const READ_TIMEOUT: &str = "read_timeout";

/// Loosely typed request configuration.
pub type Properties = Map<String, Value>;

/// Sink an entity is serialized into.
pub type EntitySink = Box<dyn AsyncWrite + Send + Unpin>;

/// Something that can serialize itself as a request body.
#[async_trait]
pub trait EntityWriter: Send {
    async fn write_to(&mut self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()>;
}

#[async_trait]
impl EntityWriter for Bytes {
    async fn write_to(&mut self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()> {
        sink.write_all(self).await
    }
}

#[async_trait]
impl EntityWriter for Vec<u8> {
    async fn write_to(&mut self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()> {
        sink.write_all(self).await
    }
}

#[async_trait]
impl EntityWriter for String {
    async fn write_to(&mut self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()> {
        sink.write_all(self.as_bytes()).await
    }
}

#[async_trait]
impl EntityWriter for &'static str {
    async fn write_to(&mut self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()> {
        sink.write_all(self.as_bytes()).await
    }
}

/// Entity produced incrementally by a stream of chunks.
pub struct StreamEntity<S>(pub S);

#[async_trait]
impl<S> EntityWriter for StreamEntity<S>
where
    S: Stream<Item = io::Result<Bytes>> + Send + Unpin,
{
    async fn write_to(&mut self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()> {
        while let Some(chunk) = self.0.next().await {
            sink.write_all(&chunk?).await?;
        }
        Ok(())
    }
}

/// Read timeout from a property value: a positive integer of milliseconds.
pub fn timeout_from_property(value: Option<&Value>) -> Option<Duration> {
    value
        .and_then(Value::as_i64)
        .and_then(|millis| u64::try_from(millis).ok())
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
}

/// A request as seen by the client framework.
pub struct ClientRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    properties: Properties,
    entity: Option<Box<dyn EntityWriter>>,
    sink: Option<EntitySink>,
}

impl ClientRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            properties: Properties::new(),
            entity: None,
            sink: None,
        }
    }

    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Append a header value, keeping earlier values for the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn entity(mut self, entity: impl EntityWriter + 'static) -> Self {
        self.entity = Some(Box::new(entity));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn has_entity(&self) -> bool {
        self.entity.is_some()
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        timeout_from_property(self.properties.get(READ_TIMEOUT))
    }

    /// Register where `write_entity` sends the serialized body.
    pub fn set_entity_sink(&mut self, sink: EntitySink) {
        self.sink = Some(sink);
    }

    /// Serialize the entity into the registered sink, then close the sink.
    ///
    /// On error the sink is dropped without being closed.
    pub async fn write_entity(&mut self) -> io::Result<()> {
        let Some(mut entity) = self.entity.take() else {
            return Ok(());
        };
        let mut sink = self.sink.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "no entity sink registered")
        })?;

        entity.write_to(sink.as_mut()).await?;
        sink.flush().await?;
        sink.shutdown().await
    }
}

impl fmt::Debug for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("properties", &self.properties)
            .field("has_entity", &self.entity.is_some())
            .finish()
    }
}
