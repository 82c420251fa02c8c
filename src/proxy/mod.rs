//! WebSocket interception inside the forward proxy.
//!
//! # Data Flow
//! ```text
//! upgrade request (from http::server)
//!     → context.rs (session ID, diagnostics sink)
//!     → websocket.rs (dial, hijack, handshake, relay)
//!         → hijack.rs (raw client stream + read-ahead bytes)
//!         → filter.rs (rewrite the handshake response)
//! ```

pub mod context;
pub mod filter;
pub mod hijack;
pub mod websocket;

pub use context::{DiagnosticSink, ProxyContext, TracingSink};
pub use filter::{FilterChain, HeaderRewriteFilter, IdentityFilter, ResponseFilter};
pub use hijack::{Hijack, HijackError, HijackSlot, Hijacked};
pub use websocket::{SessionSummary, Side, WebSocketError, WebSocketProxy};
