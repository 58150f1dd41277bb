//! Endpoint health daemon.
//!
//! Loads a client configuration, starts one health monitor per resolved
//! address and logs a health summary until SIGINT/SIGTERM.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;

use resilient_http::config::load_config;
use resilient_http::lifecycle::{
    report_until_shutdown, start_monitors, stop_monitors, wait_for_signal, Shutdown,
};
use resilient_http::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "resilient-http")]
#[command(about = "Monitor the health of every resolved address of a set of endpoints", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "resilient-http.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_tracing(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        endpoints = config.endpoints.len(),
        "resilient-http starting"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let mut monitors = start_monitors(&config, &Handle::current()).await?;

    let shutdown = Shutdown::new();
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = wait_for_signal().await {
                tracing::error!(error = %e, "Failed to listen for signals");
            }
            shutdown.trigger();
        }
    });

    let period = Duration::from_secs(config.observability.report_interval_secs.max(1));
    report_until_shutdown(&monitors, period, &mut shutdown_rx).await;

    stop_monitors(&mut monitors).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
