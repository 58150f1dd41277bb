//! Per-endpoint health monitoring.
//!
//! # Responsibilities
//! - Probe one resolved address of a logical hostname over HTTP
//! - Keep the outcome of the latest probe in a lock-free flag
//! - Re-probe eagerly while the endpoint is marked unhealthy
//! - Run probes at a fixed rate on an injected runtime
//!
//! # Design Decisions
//! - Probes never fail: engine errors become `Unhealthy` plus a warning
//! - A healthy endpoint is trusted until the next scheduled probe, an
//!   unhealthy one is re-checked on every read
//! - Stopping prevents future probes only; a probe in flight completes,
//!   unless `shutdown` runs out of grace and aborts it
//! - Concurrent probes are not serialized, the last write wins

use axum::http::Uri;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use url::{Host, Position, Url};

use crate::config::EndpointConfig;
use crate::engine::{EngineRequest, HttpEngine};
use crate::health::state::{HealthFlag, HealthState};
use crate::observability::metrics;

/// Errors raised while setting up a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthError {
    #[error("cannot build health URI for '{hostname}': {reason}")]
    InvalidEndpointConfiguration { hostname: String, reason: String },
}

/// Build the fixed health-check URI `<scheme>://<hostname>:<port><path>`.
///
/// The port is left out of the rendered URI when it is the scheme's
/// default (`https://api.example.com/health` for port 443); the target is
/// the same. Internationalized hostnames are rendered in punycode.
///
/// The path is taken literally: one that would need percent-encoding is
/// rejected instead of being rewritten.
pub fn health_uri(config: &EndpointConfig) -> Result<Uri, HealthError> {
    let invalid = |reason: String| HealthError::InvalidEndpointConfiguration {
        hostname: config.hostname.clone(),
        reason,
    };

    if config.hostname.trim().is_empty() {
        return Err(invalid("hostname is empty".to_string()));
    }
    if !config.health_path.is_empty() && !config.health_path.starts_with('/') {
        return Err(invalid(format!(
            "health path '{}' must start with '/'",
            config.health_path
        )));
    }

    let url = Url::parse(&format!(
        "{}://{}:{}{}",
        config.scheme, config.hostname, config.port, config.health_path
    ))
    .map_err(|e| invalid(e.to_string()))?;

    // A hostname carrying '/', '@' or ':' parses into a different authority.
    let expected = Host::parse(&config.hostname).map_err(|e| invalid(e.to_string()))?;
    let host = url.host_str().unwrap_or_default();
    if !host.eq_ignore_ascii_case(&expected.to_string())
        || url.port_or_known_default() != Some(config.port)
    {
        return Err(invalid(format!("'{url}' does not target the configured host and port")));
    }

    let path = if config.health_path.is_empty() { "/" } else { config.health_path.as_str() };
    if &url[Position::BeforePath..] != path {
        return Err(invalid(format!("health path '{}' is not a valid URI path", config.health_path)));
    }

    url.as_str()
        .parse::<Uri>()
        .map_err(|e| invalid(e.to_string()))
}

/// How long `shutdown` waits for a probe in flight.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Probe target and the health flag it maintains.
struct HealthProbe {
    engine: Arc<dyn HttpEngine>,
    address: IpAddr,
    hostname: String,
    health_uri: Uri,
    read_timeout: Option<Duration>,
    healthy: HealthFlag,
}

impl HealthProbe {
    fn new(
        engine: Arc<dyn HttpEngine>,
        address: IpAddr,
        config: &EndpointConfig,
    ) -> Result<Self, HealthError> {
        Ok(Self {
            health_uri: health_uri(config)?,
            engine,
            address,
            hostname: config.hostname.clone(),
            read_timeout: config.read_timeout(),
            healthy: HealthFlag::default(),
        })
    }

    async fn check(&self) -> HealthState {
        let start = Instant::now();
        let request = EngineRequest::get(self.health_uri.clone()).with_timeout(self.read_timeout);

        let state = match self.engine.send(request).await {
            Ok(response) => {
                // Only the status matters; the body is dropped unread.
                let status = response.status();
                tracing::info!(
                    uri = %self.health_uri,
                    address = %self.address,
                    status = status.as_u16(),
                    elapsed_ms = elapsed_ms(start),
                    "Checked endpoint health"
                );
                HealthState::from_status(status)
            }
            Err(e) => {
                tracing::warn!(
                    uri = %self.health_uri,
                    address = %self.address,
                    error = %e,
                    elapsed_ms = elapsed_ms(start),
                    "Failed to check endpoint health"
                );
                HealthState::Unhealthy
            }
        };

        self.healthy.store(state);
        metrics::record_probe(&self.hostname, self.address, state, start.elapsed());
        state
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Health monitor for one resolved address of a logical hostname.
pub struct EndpointHealthMonitor {
    probe: Arc<HealthProbe>,
    stop_tx: watch::Sender<bool>,
    schedule: Option<JoinHandle<()>>,
}

impl EndpointHealthMonitor {
    /// Recurring monitor when `check_interval_secs > 0`, one-shot otherwise.
    pub async fn start(
        engine: Arc<dyn HttpEngine>,
        address: IpAddr,
        config: &EndpointConfig,
        scheduler: &Handle,
    ) -> Result<Self, HealthError> {
        if config.check_interval().is_some() {
            Self::recurring(engine, address, config, scheduler).await
        } else {
            Self::one_shot(engine, address, config).await
        }
    }

    /// Probe once before returning and never again on a schedule.
    pub async fn one_shot(
        engine: Arc<dyn HttpEngine>,
        address: IpAddr,
        config: &EndpointConfig,
    ) -> Result<Self, HealthError> {
        let probe = Arc::new(HealthProbe::new(engine, address, config)?);
        probe.check().await;

        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            probe,
            stop_tx,
            schedule: None,
        })
    }

    /// Probe at time zero, before returning, then every
    /// `check_interval_secs` at a fixed rate on `scheduler`.
    pub async fn recurring(
        engine: Arc<dyn HttpEngine>,
        address: IpAddr,
        config: &EndpointConfig,
        scheduler: &Handle,
    ) -> Result<Self, HealthError> {
        let period = config
            .check_interval()
            .ok_or_else(|| HealthError::InvalidEndpointConfiguration {
                hostname: config.hostname.clone(),
                reason: "check interval must be greater than zero".to_string(),
            })?;
        let probe = Arc::new(HealthProbe::new(engine, address, config)?);

        let start = Instant::now();
        probe.check().await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let schedule = scheduler.spawn(run_schedule(probe.clone(), start, period, stop_rx));

        tracing::debug!(
            uri = %probe.health_uri,
            address = %address,
            interval_secs = period.as_secs(),
            "Health schedule started"
        );

        Ok(Self {
            probe,
            stop_tx,
            schedule: Some(schedule),
        })
    }

    /// Current health. While unhealthy, probes again first and returns
    /// the fresh result.
    pub async fn is_healthy(&self) -> bool {
        if !self.probe.healthy.load().is_healthy() {
            self.probe.check().await;
        }
        self.probe.healthy.load().is_healthy()
    }

    /// Stored state, without probing.
    pub fn health_state(&self) -> HealthState {
        self.probe.healthy.load()
    }

    /// Run one probe now and return its classification.
    pub async fn check_health_status(&self) -> HealthState {
        self.probe.check().await
    }

    /// Stop scheduled probing. A probe already running is left to finish.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Stop and wait up to [`SHUTDOWN_GRACE`] for a probe in flight.
    pub async fn shutdown(&mut self) {
        self.shutdown_within(SHUTDOWN_GRACE).await
    }

    /// Stop and wait up to `grace` for a probe in flight, then abort it.
    ///
    /// An aborted probe leaves the stored state untouched.
    pub async fn shutdown_within(&mut self, grace: Duration) {
        self.stop();
        let Some(mut schedule) = self.schedule.take() else {
            return;
        };
        if time::timeout(grace, &mut schedule).await.is_err() {
            schedule.abort();
            tracing::warn!(
                uri = %self.probe.health_uri,
                address = %self.probe.address,
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "Probe still running at shutdown, aborted"
            );
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_some() && !*self.stop_tx.borrow()
    }

    pub fn address(&self) -> IpAddr {
        self.probe.address
    }

    pub fn hostname(&self) -> &str {
        &self.probe.hostname
    }

    pub fn health_uri(&self) -> &Uri {
        &self.probe.health_uri
    }

    /// The shared engine; not owned by the monitor.
    pub fn engine(&self) -> &Arc<dyn HttpEngine> {
        &self.probe.engine
    }
}

async fn run_schedule(
    probe: Arc<HealthProbe>,
    start: Instant,
    period: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(start + period, period);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {
                if *stop_rx.borrow() {
                    break;
                }
                probe.check().await;
            }
        }
    }

    tracing::debug!(uri = %probe.health_uri, address = %probe.address, "Health schedule stopped");
}

impl Drop for EndpointHealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for EndpointHealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointHealthMonitor")
            .field("address", &self.probe.address)
            .field("healthy", &self.health_state())
            .field("hostname", &self.probe.hostname)
            .field("health_uri", &self.probe.health_uri)
            .finish()
    }
}

impl fmt::Display for EndpointHealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) via {}: {}",
            self.probe.hostname,
            self.probe.address,
            self.probe.health_uri,
            self.health_state()
        )
    }
}
