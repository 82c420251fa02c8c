//! Per-connection request-scoped state.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use uuid::Uuid;

use crate::net::connection::ConnectionId;

/// Receives diagnostics for failed connections.
///
/// Purely observational: nothing a sink does affects the connection.
pub trait DiagnosticSink: Send + Sync {
    fn warn(&self, ctx: &ProxyContext, message: fmt::Arguments<'_>);
}

/// Forwards diagnostics to `tracing` at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, ctx: &ProxyContext, message: fmt::Arguments<'_>) {
        tracing::warn!(
            session_id = %ctx.session_id,
            connection_id = %ctx.connection_id,
            peer_addr = ?ctx.peer_addr,
            "{}",
            message
        );
    }
}

/// State for one inbound connection, passed by reference through every stage.
#[derive(Clone)]
pub struct ProxyContext {
    pub session_id: Uuid,
    pub connection_id: ConnectionId,
    pub peer_addr: Option<SocketAddr>,
    sink: Arc<dyn DiagnosticSink>,
}

impl ProxyContext {
    pub fn new(connection_id: ConnectionId, peer_addr: Option<SocketAddr>) -> Self {
        Self::with_sink(connection_id, peer_addr, Arc::new(TracingSink))
    }

    pub fn with_sink(
        connection_id: ConnectionId,
        peer_addr: Option<SocketAddr>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            connection_id,
            peer_addr,
            sink,
        }
    }

    /// Report a diagnostic for this connection.
    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.sink.warn(self, message);
    }
}

impl fmt::Debug for ProxyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyContext")
            .field("session_id", &self.session_id)
            .field("connection_id", &self.connection_id)
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

/// `ctx_warn!(ctx, "format {}", args)` reports through the context's sink.
#[macro_export]
macro_rules! ctx_warn {
    ($ctx:expr, $($arg:tt)+) => {
        $ctx.warn(format_args!($($arg)+))
    };
}
