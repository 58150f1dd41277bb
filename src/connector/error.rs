//! Connector error taxonomy.

use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;

use crate::engine::EngineError;

/// Errors surfaced to connector callers. Nothing is retried internally.
///
/// Sources sit behind `Arc` so one failure can reach both the callback and
/// the response handle.
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// The engine failed to carry out the exchange.
    #[error("the sending process failed: {0}")]
    SendFailure(#[source] Arc<EngineError>),

    /// The exchange was cancelled before a response arrived.
    #[error("the sending process was interrupted")]
    SendInterrupted,

    /// The request body could not be streamed into the engine.
    #[error("streaming the request body failed: {0}")]
    StreamingSendFailure(#[source] Arc<io::Error>),
}

impl ConnectorError {
    pub(crate) fn from_engine(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => ConnectorError::SendInterrupted,
            other => ConnectorError::SendFailure(Arc::new(other)),
        }
    }

    pub(crate) fn from_join(err: JoinError) -> Self {
        if err.is_cancelled() {
            ConnectorError::SendInterrupted
        } else {
            ConnectorError::SendFailure(Arc::new(EngineError::transport(format!(
                "send task failed: {err}"
            ))))
        }
    }

    pub(crate) fn streaming(err: io::Error) -> Self {
        ConnectorError::StreamingSendFailure(Arc::new(err))
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorError::SendFailure(_) => "send_failure",
            ConnectorError::SendInterrupted => "interrupted",
            ConnectorError::StreamingSendFailure(_) => "streaming_failure",
        }
    }
}
