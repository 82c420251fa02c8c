//! WebSocket relaying for a man-in-the-middle forward proxy.
//!
//! Upgrade requests are detected, the destination is dialed (directly or
//! through an upstream CONNECT proxy, with TLS when the inbound leg had
//! it), the handshake response passes through a filter, and bytes are then
//! relayed both ways until either side closes.

pub mod config;
pub mod dial;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod relay;

pub use config::RelayConfig;
pub use http::RelayServer;
pub use lifecycle::Shutdown;
pub use proxy::WebSocketProxy;
