use axum::http::{HeaderName, HeaderValue, Method, Uri};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use resilient_http::config::{load_config, ConnectorConfig, EndpointConfig, ObservabilityConfig};
use resilient_http::connector::{ClientRequest, Connector, EngineConnector, READ_TIMEOUT};
use resilient_http::engine::HyperEngine;
use resilient_http::health::EndpointHealthMonitor;
use resilient_http::observability::logging;

#[derive(Parser)]
#[command(name = "endpoint-cli")]
#[command(about = "Probe endpoints and send one-off requests", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe one address of a hostname once and print its health
    Check {
        #[arg(long)]
        host: String,
        #[arg(long)]
        address: IpAddr,
        #[arg(long, default_value_t = 443)]
        port: u16,
        #[arg(long, default_value = "/health")]
        path: String,
        #[arg(long, default_value = "https")]
        scheme: String,
        /// Read timeout in milliseconds; negative disables it
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        timeout_ms: i64,
    },
    /// Send one request and print the response
    Send {
        #[arg(long)]
        url: Uri,
        #[arg(short = 'X', long, default_value = "GET")]
        method: Method,
        /// Header as `name: value`, repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Request body, streamed to the server
        #[arg(short, long)]
        data: Option<String>,
        #[arg(long)]
        timeout_ms: Option<i64>,
        /// Config file whose `[connector]` section tunes the connector
        #[arg(long)]
        config: Option<PathBuf>,
        /// Request body pipe capacity in bytes; overrides the config file
        #[arg(long)]
        pipe_buffer: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_tracing(&ObservabilityConfig {
        log_level: cli.log_level.clone(),
        ..ObservabilityConfig::default()
    });

    match cli.command {
        Commands::Check {
            host,
            address,
            port,
            path,
            scheme,
            timeout_ms,
        } => {
            let config = EndpointConfig {
                port,
                health_path: path,
                scheme,
                read_timeout_ms: timeout_ms,
                ..EndpointConfig::new(host)
            };
            let engine = Arc::new(HyperEngine::pinned(address));
            let monitor = EndpointHealthMonitor::one_shot(engine, address, &config).await?;
            println!("{monitor}");
            if !monitor.health_state().is_healthy() {
                std::process::exit(1);
            }
        }
        Commands::Send {
            url,
            method,
            headers,
            data,
            timeout_ms,
            config,
            pipe_buffer,
        } => {
            let mut request = ClientRequest::new(method, url);
            for header in &headers {
                let (name, value) = parse_header(header)?;
                request = request.header(name, value);
            }
            if let Some(timeout_ms) = timeout_ms {
                request = request.property(READ_TIMEOUT, timeout_ms);
            }
            if let Some(data) = data {
                request = request.entity(data);
            }

            let mut connector_config = match config {
                Some(path) => load_config(&path)?.connector,
                None => ConnectorConfig::default(),
            };
            if let Some(pipe_buffer) = pipe_buffer {
                connector_config.pipe_buffer_bytes = pipe_buffer;
            }
            let connector = EngineConnector::from_config(Arc::new(HyperEngine::new()), &connector_config);
            let response = connector.execute(request).await?;

            println!("{} {}", response.status().as_u16(), response.reason_phrase());
            for (name, value) in response.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            println!();
            println!("{}", response.text(usize::MAX).await?);
        }
    }

    Ok(())
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), Box<dyn std::error::Error>> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("header '{raw}' is not in 'name: value' form"))?;
    Ok((
        HeaderName::try_from(name.trim())?,
        HeaderValue::try_from(value.trim())?,
    ))
}
