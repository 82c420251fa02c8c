//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the WebSocket relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, inbound TLS).
    pub listener: ListenerConfig,

    /// Dial and handshake deadlines.
    pub timeouts: TimeoutConfig,

    /// Optional upstream proxy every destination dial tunnels through.
    pub upstream_proxy: Option<UpstreamProxyConfig>,

    /// Trust settings for TLS dials to destinations.
    pub tls: TlsClientConfig,

    /// Handshake response rewriting.
    pub filter: FilterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Optional TLS termination for inbound connections.
    pub tls: Option<ListenerTlsConfig>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// Certificate served to inbound clients when the listener terminates TLS.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerTlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration for the pre-relay stages.
///
/// The relay phase itself has no deadline; it lasts as long as both
/// transports stay open.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Destination dial timeout (including proxy tunnel and TLS) in seconds.
    pub dial_secs: u64,

    /// Handshake write + response read timeout in seconds.
    pub handshake_secs: u64,
}

impl TimeoutConfig {
    pub fn dial(&self) -> Duration {
        Duration::from_secs(self.dial_secs)
    }

    pub fn handshake(&self) -> Duration {
        Duration::from_secs(self.handshake_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dial_secs: 30,
            handshake_secs: 45,
        }
    }
}

/// Upstream proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamProxyConfig {
    /// Proxy URL, `http://host:port` or `https://host:port`.
    /// Userinfo in the URL is used when `username` is not set.
    pub url: String,

    /// Username for `Proxy-Authorization: Basic`.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for `Proxy-Authorization: Basic`.
    #[serde(default)]
    pub password: Option<String>,
}

/// Trust configuration for outbound TLS.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsClientConfig {
    /// Load the operating system's trust store.
    pub use_native_roots: bool,

    /// Add the bundled Mozilla root set.
    pub use_webpki_roots: bool,

    /// Additional PEM files with trusted CA certificates.
    pub extra_ca_paths: Vec<String>,

    /// SNI / verification name to use instead of the target host.
    pub server_name_override: Option<String>,
}

impl Default for TlsClientConfig {
    fn default() -> Self {
        Self {
            use_native_roots: true,
            use_webpki_roots: true,
            extra_ca_paths: Vec::new(),
            server_name_override: None,
        }
    }
}

/// Handshake response rewriting applied before the response reaches the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Headers to set (replacing existing values).
    pub set_response_headers: BTreeMap<String, String>,

    /// Headers to strip.
    pub remove_response_headers: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
