//! Startup orchestration.
//!
//! Every configured address gets its own engine whose resolver is pinned
//! to that address, so probes reach it while the `Host` header still names
//! the logical hostname.

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::config::ClientConfig;
use crate::engine::HyperEngine;
use crate::health::{EndpointHealthMonitor, HealthError};

/// Build and start one monitor per (endpoint, address), in config order.
///
/// Recurring monitors are scheduled on `scheduler`. The first probe of each
/// monitor has run by the time this returns.
pub async fn start_monitors(
    config: &ClientConfig,
    scheduler: &Handle,
) -> Result<Vec<EndpointHealthMonitor>, HealthError> {
    let mut monitors = Vec::new();

    for endpoint in &config.endpoints {
        for address in &endpoint.addresses {
            let engine = Arc::new(HyperEngine::pinned(*address));
            let monitor = EndpointHealthMonitor::start(engine, *address, endpoint, scheduler).await?;

            tracing::info!(
                endpoint = %endpoint.name,
                hostname = %endpoint.hostname,
                address = %address,
                state = %monitor.health_state(),
                scheduled = monitor.is_scheduled(),
                "Monitor started"
            );
            monitors.push(monitor);
        }
    }

    Ok(monitors)
}

/// Stop every monitor and wait for probes in flight, each within the
/// shutdown grace period. Monitors shut down concurrently.
pub async fn stop_monitors(monitors: &mut [EndpointHealthMonitor]) {
    join_all(monitors.iter_mut().map(|monitor| monitor.shutdown())).await;
    tracing::info!(count = monitors.len(), "Monitors stopped");
}
