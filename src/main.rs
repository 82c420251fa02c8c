//! ws-mitm-relay
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ net::listener ──▶ http::server ──(upgrade?)──▶ proxy::websocket
//!                                    │ no                        │
//!                                    ▼                           ▼
//!                                   501                   dial::Dialer ──▶ [upstream CONNECT] ──▶ Destination
//!                                                                │
//!                                              relay::handshake ─┤ (filter response)
//!                                              relay::duplex ────┘ (bytes both ways)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use ws_mitm_relay::config::validation::validate_config;
use ws_mitm_relay::config::{load_config, ConfigError, RelayConfig, UpstreamProxyConfig};
use ws_mitm_relay::lifecycle::{start, wait_for_signal};
use ws_mitm_relay::observability::{logging, metrics};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "ws-mitm-relay", version, about = "Relay WebSocket upgrades through an intercepting proxy")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Tunnel destination connections through this HTTP(S) proxy.
    #[arg(long)]
    upstream_proxy: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<RelayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(url) = &cli.upstream_proxy {
        config.upstream_proxy = Some(UpstreamProxyConfig {
            url: url.clone(),
            username: None,
            password: None,
        });
    }
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init_logging(&config.observability);
    tracing::info!("ws-mitm-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        inbound_tls = config.listener.tls.is_some(),
        upstream_proxy = config.upstream_proxy.is_some(),
        dial_timeout_secs = config.timeouts.dial_secs,
        handshake_timeout_secs = config.timeouts.handshake_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let running = start(&config).await?;
    tracing::info!(address = %running.local_addr, "Listening for connections");

    wait_for_signal().await;
    let drained = running.stop(DRAIN_TIMEOUT).await?;

    tracing::info!(drained, "Shutdown complete");
    Ok(())
}
