//! Destination dialing subsystem.
//!
//! # Data Flow
//! ```text
//! Target { scheme, host, port, path }
//!     → upstream.rs (optional: TCP [+ TLS] to proxy, CONNECT host:port)
//!     → or direct TCP to host:port
//!     → TLS session to host when the scheme is secure (wss/https)
//!     → DuplexStream handed to the handshake stage
//! ```
//!
//! # Design Decisions
//! - Transport follows the target scheme only: secure schemes always get TLS,
//!   plain schemes never do
//! - The upstream proxy is explicit configuration, never a built-in default
//! - One attempt per connection; the whole dial shares one deadline
//! - Failures surface as `DialError` and are never retried here

pub mod stream;
pub mod target;
pub mod upstream;

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::config::RelayConfig;
use crate::net::tls::{build_client_config, TlsSetupError};

pub use stream::DuplexStream;
pub use target::{Scheme, Target, TargetError};
pub use upstream::UpstreamProxy;

/// Failures reaching a destination.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("invalid upstream proxy: {0}")]
    InvalidProxy(String),

    #[error("failed to connect to upstream proxy {addr}: {source}")]
    ProxyConnect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upstream proxy I/O error: {0}")]
    ProxyIo(#[source] std::io::Error),

    #[error("upstream proxy protocol error: {0}")]
    ProxyProtocol(String),

    #[error("upstream proxy refused tunnel: {status} {reason}")]
    ProxyRefused { status: StatusCode, reason: String },

    #[error("failed to connect to {addr}: {source}")]
    TargetConnect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS server name {0:?}")]
    InvalidServerName(String),

    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS setup failed: {0}")]
    TlsSetup(#[from] TlsSetupError),

    #[error("dial timed out after {0:?}")]
    Timeout(Duration),
}

/// Everything the dialer needs, already resolved.
#[derive(Debug, Clone)]
pub struct DialerConfig {
    pub upstream: Option<UpstreamProxy>,
    pub tls: Arc<ClientConfig>,
    pub server_name_override: Option<String>,
    pub dial_timeout: Duration,
}

impl DialerConfig {
    pub fn new(tls: Arc<ClientConfig>) -> Self {
        Self {
            upstream: None,
            tls,
            server_name_override: None,
            dial_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_upstream(mut self, upstream: UpstreamProxy) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_server_name_override(mut self, name: impl Into<String>) -> Self {
        self.server_name_override = Some(name.into());
        self
    }
}

/// Opens connections to WebSocket destinations.
#[derive(Clone)]
pub struct Dialer {
    connector: TlsConnector,
    upstream: Option<UpstreamProxy>,
    server_name_override: Option<String>,
    dial_timeout: Duration,
}

impl std::fmt::Debug for Dialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialer")
            .field("upstream", &self.upstream)
            .field("server_name_override", &self.server_name_override)
            .field("dial_timeout", &self.dial_timeout)
            .finish_non_exhaustive()
    }
}

impl Dialer {
    pub fn new(config: DialerConfig) -> Self {
        Self {
            connector: TlsConnector::from(config.tls),
            upstream: config.upstream,
            server_name_override: config.server_name_override,
            dial_timeout: config.dial_timeout,
        }
    }

    /// Build a dialer from relay configuration (trust roots, proxy, timeout).
    pub fn from_config(config: &RelayConfig) -> Result<Self, DialError> {
        let mut dialer_config = DialerConfig::new(build_client_config(&config.tls)?)
            .with_dial_timeout(config.timeouts.dial());
        if let Some(proxy) = &config.upstream_proxy {
            dialer_config = dialer_config.with_upstream(UpstreamProxy::from_config(proxy)?);
        }
        if let Some(name) = &config.tls.server_name_override {
            dialer_config = dialer_config.with_server_name_override(name.clone());
        }
        Ok(Self::new(dialer_config))
    }

    /// Connect to `target`, tunnelling through the upstream proxy if one is
    /// configured and negotiating TLS when the target scheme is secure.
    ///
    /// `user_agent` is passed on to the proxy's CONNECT request.
    pub async fn dial(&self, target: &Target, user_agent: Option<&str>) -> Result<DuplexStream, DialError> {
        tokio::time::timeout(self.dial_timeout, self.dial_inner(target, user_agent))
            .await
            .map_err(|_| DialError::Timeout(self.dial_timeout))?
    }

    async fn dial_inner(&self, target: &Target, user_agent: Option<&str>) -> Result<DuplexStream, DialError> {
        let authority = target.authority();
        let mut stream = match &self.upstream {
            Some(proxy) => {
                let tcp = DuplexStream::Tcp(proxy.connect().await?);
                let mut stream = if proxy.secure {
                    self.wrap_tls(tcp, proxy.server_name()).await?
                } else {
                    tcp
                };
                proxy.establish_tunnel(&mut stream, &authority, user_agent).await?;
                stream
            }
            None => {
                let tcp = TcpStream::connect(&authority)
                    .await
                    .map_err(|source| DialError::TargetConnect {
                        addr: authority.clone(),
                        source,
                    })?;
                tcp.set_nodelay(true).ok();
                DuplexStream::Tcp(tcp)
            }
        };

        if target.scheme.is_secure() {
            let name = self
                .server_name_override
                .as_deref()
                .unwrap_or_else(|| target.server_name());
            stream = self.wrap_tls(stream, name).await?;
        }

        tracing::debug!(
            target = %target,
            via_proxy = self.upstream.is_some(),
            tls = stream.is_tls(),
            "Destination connected"
        );
        Ok(stream)
    }

    async fn wrap_tls(&self, stream: DuplexStream, host: &str) -> Result<DuplexStream, DialError> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| DialError::InvalidServerName(host.to_string()))?;
        let tls = self
            .connector
            .connect(server_name, stream)
            .await
            .map_err(|source| DialError::Tls {
                host: host.to_string(),
                source,
            })?;
        Ok(DuplexStream::Tls(Box::new(tls)))
    }
}
