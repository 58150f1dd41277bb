//! Completion callbacks and the handle returned by asynchronous dispatch.

use axum::http::StatusCode;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::connector::error::ConnectorError;
use crate::connector::response::ClientResponse;

/// Receives the outcome of an asynchronous request.
///
/// Both methods consume the callback, so at most one of them ever runs.
pub trait AsyncCallback: Send + 'static {
    fn on_response(self: Box<Self>, response: ClientResponse);
    fn on_failure(self: Box<Self>, error: ConnectorError);
}

/// Callback built from a pair of closures.
pub struct FnCallback<R, F> {
    on_response: R,
    on_failure: F,
}

/// Build a callback from two closures.
pub fn callback_fn<R, F>(on_response: R, on_failure: F) -> Box<dyn AsyncCallback>
where
    R: FnOnce(ClientResponse) + Send + 'static,
    F: FnOnce(ConnectorError) + Send + 'static,
{
    Box::new(FnCallback {
        on_response,
        on_failure,
    })
}

impl<R, F> AsyncCallback for FnCallback<R, F>
where
    R: FnOnce(ClientResponse) + Send + 'static,
    F: FnOnce(ConnectorError) + Send + 'static,
{
    fn on_response(self: Box<Self>, response: ClientResponse) {
        (self.on_response)(response)
    }

    fn on_failure(self: Box<Self>, error: ConnectorError) {
        (self.on_failure)(error)
    }
}

/// Forward the outcome through a channel. A dropped receiver is ignored.
impl AsyncCallback for oneshot::Sender<Result<ClientResponse, ConnectorError>> {
    fn on_response(self: Box<Self>, response: ClientResponse) {
        let _ = (*self).send(Ok(response));
    }

    fn on_failure(self: Box<Self>, error: ConnectorError) {
        let _ = (*self).send(Err(error));
    }
}

/// Owns the callback for the dispatch task.
///
/// Dropping the guard without `complete` reports `SendInterrupted`, which
/// covers a task aborted before or during its run.
pub(crate) struct CallbackGuard {
    callback: Option<Box<dyn AsyncCallback>>,
}

impl CallbackGuard {
    pub(crate) fn new(callback: Box<dyn AsyncCallback>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    pub(crate) fn complete(mut self, result: Result<ClientResponse, ConnectorError>) {
        if let Some(callback) = self.callback.take() {
            match result {
                Ok(response) => callback.on_response(response),
                Err(error) => callback.on_failure(error),
            }
        }
    }
}

impl Drop for CallbackGuard {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback.on_failure(ConnectorError::SendInterrupted);
        }
    }
}

/// Handle on an asynchronous request.
///
/// The response itself, body included, belongs to the callback, so the
/// handle only carries its status: awaiting it yields the status once the
/// callback has run, or the error the callback received. Callers that want
/// the whole response through an awaitable pass a `oneshot::Sender` as the
/// callback and await the receiver.
///
/// Dropping the handle does not cancel the request.
pub struct ResponseHandle {
    task: JoinHandle<Result<StatusCode, ConnectorError>>,
}

impl ResponseHandle {
    pub(crate) fn new(task: JoinHandle<Result<StatusCode, ConnectorError>>) -> Self {
        Self { task }
    }

    /// Abort the request. The callback, if not yet run, receives
    /// `SendInterrupted`.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for ResponseHandle {
    type Output = Result<StatusCode, ConnectorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let joined = ready!(Pin::new(&mut self.task).poll(cx));
        Poll::Ready(joined.unwrap_or_else(|e| Err(ConnectorError::from_join(e))))
    }
}

impl fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Response;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Box<dyn AsyncCallback>) {
        let responses = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let (r, f) = (responses.clone(), failures.clone());
        let callback = callback_fn(
            move |_| {
                r.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            },
        );
        (responses, failures, callback)
    }

    #[test]
    fn test_guard_completes_once() {
        let (responses, failures, callback) = counting();
        CallbackGuard::new(callback).complete(Ok(ClientResponse::from_engine(Response::new(Body::empty()))));
        assert_eq!(responses.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropped_guard_reports_interruption() {
        let (tx, mut rx) = oneshot::channel::<Result<ClientResponse, ConnectorError>>();
        drop(CallbackGuard::new(Box::new(tx)));
        assert!(matches!(rx.try_recv(), Ok(Err(ConnectorError::SendInterrupted))));
    }

    #[tokio::test]
    async fn test_cancelled_handle_resolves_interrupted() {
        let (responses, failures, callback) = counting();
        let guard = CallbackGuard::new(callback);
        let task = tokio::spawn(async move {
            std::future::pending::<()>().await;
            guard.complete(Err(ConnectorError::SendInterrupted));
            Ok(StatusCode::OK)
        });

        let handle = ResponseHandle::new(task);
        handle.cancel();
        assert!(matches!(handle.await, Err(ConnectorError::SendInterrupted)));
        assert_eq!(responses.load(Ordering::SeqCst), 0);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }
}
