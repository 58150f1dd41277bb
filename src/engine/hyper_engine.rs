//! Engine backed by the hyper-util legacy client.
//!
//! # Responsibilities
//! - Carry out exchanges over a pooled hyper client
//! - Enforce the per-request timeout around the response head
//! - Optionally pin every hostname to a single resolved address
//! - Speak `http` and `https` (rustls, webpki roots); TLS server name and
//!   certificate checks use the URI hostname, never the pinned address

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{
        connect::{dns::Name, Connect, HttpConnector},
        Client,
    },
    rt::TokioExecutor,
};
use std::future::{ready, Ready};
use std::iter::{once, Once};
use std::net::{IpAddr, SocketAddr};
use std::task::{Context, Poll};
use tokio::time;
use tower::Service;

use crate::engine::{EngineError, EngineRequest, HttpEngine};

/// DNS resolver answering every name with one fixed address.
///
/// The URI keeps the logical hostname (Host header), the socket goes to
/// `address`. Port 0 lets the connector fill in the URI port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinnedResolver {
    address: IpAddr,
}

impl PinnedResolver {
    pub fn new(address: IpAddr) -> Self {
        Self { address }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }
}

impl Service<Name> for PinnedResolver {
    type Response = Once<SocketAddr>;
    type Error = std::io::Error;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, name: Name) -> Self::Future {
        tracing::trace!(host = %name.as_str(), address = %self.address, "Resolving pinned host");
        ready(Ok(once(SocketAddr::new(self.address, 0))))
    }
}

/// Engine built on `hyper_util::client::legacy::Client`.
#[derive(Debug, Clone)]
pub struct HyperEngine<C = HttpsConnector<HttpConnector>> {
    client: Client<C, Body>,
}

/// Wrap a TCP connector so `https` URIs are served over TLS.
fn tls<R>(mut http: HttpConnector<R>) -> HttpsConnector<HttpConnector<R>> {
    http.enforce_http(false);
    // Another dependency may compile in a second provider; pick one.
    let _ = rustls::crypto::ring::default_provider().install_default();
    HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http)
}

impl HyperEngine {
    /// Engine using system DNS.
    pub fn new() -> Self {
        Self::with_connector(tls(HttpConnector::new()))
    }
}

impl Default for HyperEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperEngine<HttpsConnector<HttpConnector<PinnedResolver>>> {
    /// Engine whose connections all go to `address`, whatever the hostname.
    pub fn pinned(address: IpAddr) -> Self {
        Self::with_connector(tls(HttpConnector::new_with_resolver(PinnedResolver::new(address))))
    }
}

impl<C> HyperEngine<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn with_connector(connector: C) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

#[async_trait]
impl<C> HttpEngine for HyperEngine<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn send(&self, request: EngineRequest) -> Result<Response<Body>, EngineError> {
        let (request, timeout) = request.into_http()?;
        let response_future = self.client.request(request);

        let response = match timeout {
            Some(timeout) => time::timeout(timeout, response_future)
                .await
                .map_err(|_| EngineError::Timeout(timeout))?,
            None => response_future.await,
        }
        .map_err(EngineError::transport)?;

        Ok(response.map(Body::new))
    }
}
