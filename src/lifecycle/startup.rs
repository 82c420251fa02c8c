//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the relay server (TLS material, trust roots, upstream proxy)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::http::server::{RelayServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to bind listener: {0}")]
    Listener(#[from] ListenerError),
}

/// A started relay.
pub struct Running {
    pub local_addr: SocketAddr,
    pub shutdown: Shutdown,
    pub connections: ConnectionTracker,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl Running {
    /// Stop accepting, then wait up to `drain` for live connections.
    ///
    /// Returns whether every connection finished in time.
    pub async fn stop(self, drain: Duration) -> Result<bool, ServerError> {
        self.shutdown.trigger();
        match self.handle.await {
            Ok(result) => result?,
            Err(e) => tracing::error!(error = %e, "Accept loop panicked"),
        }
        let drained = self.connections.wait_for_drain(drain).await;
        if !drained {
            tracing::warn!(
                remaining = self.connections.active_count(),
                "Drain timed out, abandoning live connections"
            );
        }
        Ok(drained)
    }
}

/// Start a relay for `config` using a prepared server.
pub async fn start_server(config: &RelayConfig, server: RelayServer) -> Result<Running, StartupError> {
    let listener = Listener::bind(&config.listener).await?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;
    let shutdown = Shutdown::new();
    let connections = server.connections();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Ok(Running {
        local_addr,
        shutdown,
        connections,
        handle,
    })
}

/// Build and start a relay from configuration.
pub async fn start(config: &RelayConfig) -> Result<Running, StartupError> {
    let server = RelayServer::from_config(config)?;
    start_server(config, server).await
}
