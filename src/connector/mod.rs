//! Request connector subsystem.
//!
//! # Data Flow
//! ```text
//! ClientRequest
//!     → no entity: EngineRequest with an empty body → engine.send
//!     → entity:    pipe(writer → sink, reader → engine body)
//!                  spawn engine.send, write_entity() on this task
//!     → Response<Body> → ClientResponse (headers copied, body streamed)
//! ```
//!
//! # Design Decisions
//! - Synchronous and asynchronous entry points share one dispatch path
//! - Asynchronous callers get exactly one callback, also on cancellation
//! - Failures are reported once and never retried

pub mod callback;
pub mod engine_connector;
pub mod error;
pub mod pipe;
pub mod request;
pub mod response;

use async_trait::async_trait;

pub use callback::{callback_fn, AsyncCallback, FnCallback, ResponseHandle};
pub use engine_connector::EngineConnector;
pub use error::ConnectorError;
pub use pipe::{pipe, PipeReader, PipeWriter, DEFAULT_PIPE_CAPACITY};
pub use request::{ClientRequest, EntityWriter, Properties, StreamEntity, READ_TIMEOUT};
pub use response::ClientResponse;

/// Executes client requests on behalf of a client framework.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Run the request on the caller's task.
    async fn execute(&self, request: ClientRequest) -> Result<ClientResponse, ConnectorError>;

    /// Run the request in the background; `callback` receives the outcome.
    fn execute_async(&self, request: ClientRequest, callback: Box<dyn AsyncCallback>) -> ResponseHandle;

    fn name(&self) -> &str;

    fn close(&self);
}
