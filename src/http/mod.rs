//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (accept, TLS termination, dispatch)
//!     → prebuffered.rs (read-ahead buffer shared by every parser)
//!     → message.rs (request/response heads and framed bodies)
//!     → upgrade.rs (is this a WebSocket upgrade?)
//!     → proxy::websocket (hijack and relay) or 501
//! ```
//!
//! # Design Decisions
//! - HTTP/1.1 only: upgrades do not exist on HTTP/2 connections here
//! - Parsers never consume bytes past the message they parse

pub mod message;
pub mod prebuffered;
pub mod server;
pub mod upgrade;

pub use message::{Request, Response};
pub use prebuffered::Prebuffered;
pub use server::{RelayServer, ServerError};
pub use upgrade::is_upgrade_request;
