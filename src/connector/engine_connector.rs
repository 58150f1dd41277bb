//! Connector backed by an `HttpEngine`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use std::io;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use crate::config::ConnectorConfig;
use crate::connector::callback::{AsyncCallback, CallbackGuard, ResponseHandle};
use crate::connector::error::ConnectorError;
use crate::connector::pipe::{pipe, DEFAULT_PIPE_CAPACITY};
use crate::connector::request::ClientRequest;
use crate::connector::response::ClientResponse;
use crate::connector::Connector;
use crate::engine::{EngineError, EngineRequest, HttpEngine};
use crate::observability::metrics;

const CONNECTOR_NAME: &str = concat!("resilient-http engine connector/", env!("CARGO_PKG_VERSION"));

/// Runs client requests on a shared engine.
#[derive(Clone)]
pub struct EngineConnector {
    engine: Arc<dyn HttpEngine>,
    pipe_capacity: usize,
}

impl EngineConnector {
    pub fn new(engine: Arc<dyn HttpEngine>) -> Self {
        Self {
            engine,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }

    pub fn from_config(engine: Arc<dyn HttpEngine>, config: &ConnectorConfig) -> Self {
        Self::new(engine).with_pipe_capacity(config.pipe_buffer_bytes)
    }

    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity.max(1);
        self
    }

    pub fn pipe_capacity(&self) -> usize {
        self.pipe_capacity
    }

    pub fn engine(&self) -> &Arc<dyn HttpEngine> {
        &self.engine
    }

    /// Engine request carrying the client's method, URI, headers and timeout.
    /// The body is left empty.
    fn engine_request(request: &ClientRequest) -> EngineRequest {
        EngineRequest::new(request.method().clone(), request.uri().clone())
            .with_headers(request.headers().clone())
            .with_timeout(request.read_timeout())
    }

    async fn dispatch(&self, request: ClientRequest, mode: &'static str) -> Result<ClientResponse, ConnectorError> {
        let start = Instant::now();
        let method = request.method().clone();
        let uri = request.uri().clone();

        let result = if request.has_entity() {
            self.send_streaming(request).await
        } else {
            self.send_empty(request).await
        };

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(response) => {
                tracing::debug!(
                    method = %method,
                    uri = %uri,
                    mode,
                    status = response.status().as_u16(),
                    elapsed_ms,
                    "Request completed"
                );
                metrics::record_request(mode, "ok");
            }
            Err(e) => {
                tracing::warn!(
                    method = %method,
                    uri = %uri,
                    mode,
                    error = %e,
                    elapsed_ms,
                    "Request failed"
                );
                metrics::record_request(mode, e.kind());
            }
        }
        result
    }

    /// No entity: the engine gets a literal empty body and no pipe is made.
    async fn send_empty(&self, request: ClientRequest) -> Result<ClientResponse, ConnectorError> {
        let engine_request = Self::engine_request(&request).with_body(Body::empty());
        drop(request);

        self.engine
            .send(engine_request)
            .await
            .map(ClientResponse::from_engine)
            .map_err(ConnectorError::from_engine)
    }

    /// Entity present: the engine pulls the body from a pipe while the
    /// entity is written into it on this task.
    async fn send_streaming(&self, mut request: ClientRequest) -> Result<ClientResponse, ConnectorError> {
        let (writer, reader) = pipe(self.pipe_capacity);
        request.set_entity_sink(Box::new(writer));
        let engine_request = Self::engine_request(&request).with_body(reader.into_body());

        let engine = self.engine.clone();
        let send = SendTask::spawn(async move { engine.send(engine_request).await });

        if let Err(e) = request.write_entity().await {
            if e.kind() == io::ErrorKind::BrokenPipe {
                // The engine dropped the body; its own outcome is the cause.
                if let Ok(Err(cause)) = send.join().await {
                    return Err(ConnectorError::from_engine(cause));
                }
            } else {
                // The writer is gone, so the engine sees a truncated body
                // and fails by itself.
                send.detach();
            }
            return Err(ConnectorError::streaming(e));
        }

        match send.join().await {
            Ok(Ok(response)) => Ok(ClientResponse::from_engine(response)),
            Ok(Err(e)) => Err(ConnectorError::from_engine(e)),
            Err(e) => Err(ConnectorError::from_join(e)),
        }
    }
}

#[async_trait]
impl Connector for EngineConnector {
    async fn execute(&self, request: ClientRequest) -> Result<ClientResponse, ConnectorError> {
        self.dispatch(request, "sync").await
    }

    fn execute_async(&self, request: ClientRequest, callback: Box<dyn AsyncCallback>) -> ResponseHandle {
        let connector = self.clone();
        // Must not be created inside the task: an abort before the first
        // poll would drop the callback unreported.
        let guard = CallbackGuard::new(callback);
        let task = tokio::spawn(async move {
            let result = connector.dispatch(request, "async").await;
            let status = result.as_ref().map(ClientResponse::status).map_err(ConnectorError::clone);
            guard.complete(result);
            status
        });
        ResponseHandle::new(task)
    }

    fn name(&self) -> &str {
        CONNECTOR_NAME
    }

    fn close(&self) {}
}

impl std::fmt::Debug for EngineConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConnector")
            .field("pipe_capacity", &self.pipe_capacity)
            .finish_non_exhaustive()
    }
}

type SendResult = Result<Response<Body>, EngineError>;

/// Spawned engine send, aborted when dropped unless detached.
struct SendTask {
    handle: Option<JoinHandle<SendResult>>,
}

impl SendTask {
    fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = SendResult> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    fn detach(mut self) {
        self.handle.take();
    }

    async fn join(mut self) -> Result<SendResult, JoinError> {
        match self.handle.as_mut() {
            Some(handle) => {
                let joined = handle.await;
                self.handle.take();
                joined
            }
            None => Ok(Err(EngineError::Cancelled)),
        }
    }
}

impl Drop for SendTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
