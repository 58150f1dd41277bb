//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{HeaderMap, HeaderValue, HOST, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Programmable backend state shared with the test.
#[derive(Debug, Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    health_status: Arc<AtomicU16>,
    health_hits: Arc<AtomicUsize>,
    last_host: Arc<Mutex<Option<String>>>,
}

impl MockBackend {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn set_health_status(&self, status: u16) {
        self.health_status.store(status, Ordering::SeqCst);
    }

    pub fn health_hits(&self) -> usize {
        self.health_hits.load(Ordering::SeqCst)
    }

    /// `Host` header of the most recent request.
    pub fn last_host(&self) -> Option<String> {
        self.last_host.lock().unwrap().clone()
    }

    fn remember_host(&self, headers: &HeaderMap) {
        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *self.last_host.lock().unwrap() = host;
    }
}

/// Start a backend on an ephemeral port.
///
/// Routes:
/// - `GET /health`: the programmable status
/// - `POST /echo`: the request body
/// - `GET /cookies`: two `set-cookie` values
/// - `GET /slow`: 200 after 500 ms
pub async fn start_mock_backend(health_status: u16) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        health_status: Arc::new(AtomicU16::new(health_status)),
        health_hits: Arc::new(AtomicUsize::new(0)),
        last_host: Arc::new(Mutex::new(None)),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/echo", post(echo))
        .route("/cookies", get(cookies))
        .route("/slow", get(slow))
        .with_state(backend.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    backend
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn health(State(backend): State<MockBackend>, headers: HeaderMap) -> StatusCode {
    backend.remember_host(&headers);
    backend.health_hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::from_u16(backend.health_status.load(Ordering::SeqCst)).unwrap()
}

async fn echo(State(backend): State<MockBackend>, headers: HeaderMap, body: Bytes) -> Bytes {
    backend.remember_host(&headers);
    body
}

async fn cookies() -> Response {
    let mut response = "cookies".into_response();
    let headers = response.headers_mut();
    headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
    headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
    response
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(500)).await;
    "slow"
}
