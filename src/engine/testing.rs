//! Scripted engine for unit tests.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::header::{HeaderValue, SET_COOKIE};
use axum::http::{HeaderMap, Method, Response, StatusCode, Uri};
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{self, Instant};

use crate::engine::{EngineError, EngineRequest, HttpEngine};

/// What the engine does for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with this status, echoing the request body.
    Status(u16),
    /// Fail with a transport error.
    Fail,
    /// Fail as cancelled.
    Cancel,
    /// Drop the request body unread and fail with a transport error.
    Refuse,
    /// Wait for a permit, then answer with this status.
    Gated(Arc<Semaphore>, u16),
}

/// A request as the engine saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
    pub body: Bytes,
    pub started: Instant,
}

#[derive(Debug)]
pub struct ScriptedEngine {
    replies: Mutex<VecDeque<Reply>>,
    fallback: u16,
    delay: Duration,
    recorded: Mutex<Vec<Recorded>>,
}

impl ScriptedEngine {
    /// Engine answering `fallback` once the script runs out.
    pub fn new(fallback: u16) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.lock().unwrap().extend(replies);
        self
    }

    /// Every call takes `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpEngine for ScriptedEngine {
    async fn send(&self, request: EngineRequest) -> Result<Response<Body>, EngineError> {
        let started = Instant::now();
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Status(self.fallback));

        let index = {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.push(Recorded {
                method: request.method.clone(),
                uri: request.uri.clone(),
                headers: request.headers.clone(),
                timeout: request.timeout,
                body: Bytes::new(),
                started,
            });
            recorded.len() - 1
        };

        if matches!(reply, Reply::Refuse) {
            drop(request.body);
            return Err(EngineError::transport("connection refused"));
        }

        let body = to_bytes(request.body, usize::MAX)
            .await
            .map_err(EngineError::transport)?;
        self.recorded.lock().unwrap()[index].body = body.clone();

        if !self.delay.is_zero() {
            time::sleep(self.delay).await;
        }

        let status = match reply {
            Reply::Status(status) => status,
            Reply::Fail => return Err(EngineError::transport("connection refused")),
            Reply::Cancel => return Err(EngineError::Cancelled),
            Reply::Refuse => unreachable!("handled before the body is read"),
            Reply::Gated(gate, status) => {
                let _permit = gate.acquire().await.map_err(EngineError::transport)?;
                status
            }
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::from_u16(status).map_err(EngineError::transport)?;
        let headers = response.headers_mut();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        Ok(response)
    }
}
