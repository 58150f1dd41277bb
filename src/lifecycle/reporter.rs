//! Periodic health summary for the daemon.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::health::EndpointHealthMonitor;

/// Log a health summary every `period` until shutdown is signalled.
///
/// A summary blocked on a slow health check is abandoned as soon as the signal
/// arrives.
pub async fn report_until_shutdown(
    monitors: &[EndpointHealthMonitor],
    period: Duration,
    shutdown: &mut broadcast::Receiver<()>,
) {
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            _ = ticker.tick() => {
                tokio::select! {
                    _ = shutdown.recv() => return,
                    _ = report(monitors) => {}
                }
            }
        }
    }
}

/// Log every monitor's state. Unhealthy addresses are checked again by the read.
async fn report(monitors: &[EndpointHealthMonitor]) {
    let mut healthy = 0;
    for monitor in monitors {
        if monitor.is_healthy().await {
            healthy += 1;
        }
        tracing::debug!(monitor = %monitor, "Endpoint status");
    }
    tracing::info!(healthy, total = monitors.len(), "Health summary");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::engine::testing::{Reply, ScriptedEngine};
    use crate::lifecycle::Shutdown;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_stuck_summary() {
        let engine = ScriptedEngine::new(200)
            .with_replies([Reply::Status(503), Reply::Gated(Arc::new(Semaphore::new(0)), 200)])
            .shared();
        let monitor = EndpointHealthMonitor::one_shot(
            engine.clone(),
            "10.0.0.5".parse().unwrap(),
            &EndpointConfig::new("api.example.com"),
        )
        .await
        .unwrap();

        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let trigger = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                time::sleep(Duration::from_millis(1500)).await;
                shutdown.trigger();
            }
        });

        let started = time::Instant::now();
        report_until_shutdown(std::slice::from_ref(&monitor), Duration::from_secs(1), &mut rx).await;

        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(engine.calls(), 2);
        trigger.await.unwrap();
    }
}
