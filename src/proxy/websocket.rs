//! WebSocket interception: dial, hijack, handshake, relay.
//!
//! # Data Flow
//! ```text
//! upgrade Request + hijackable client
//!     → Target::from_request (scheme follows inbound TLS)
//!     → Dialer::dial (Dialing)
//!     → Hijack::hijack
//!     → perform_handshake (Handshaking)
//!     → relay (Relaying)
//!     → shut down both streams (Closed)
//! ```
//!
//! # Design Decisions
//! - One attempt per connection; any failure closes both sides
//! - Each failure is reported once through the context's sink
//! - Relaying continues after a non-101 response; the destination decides
//!   what the bytes mean

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::USER_AGENT;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::RelayConfig;
use crate::ctx_warn;
use crate::dial::{DialError, Dialer, Target, TargetError};
use crate::http::message::Request;
use crate::http::prebuffered::Prebuffered;
use crate::net::connection::ConnectionState;
use crate::observability::metrics;
use crate::proxy::context::ProxyContext;
use crate::proxy::filter::{HeaderRewriteFilter, IdentityFilter, ResponseFilter};
use crate::proxy::hijack::{Hijack, HijackError};
use crate::relay::{perform_handshake, relay, Direction, HandshakeError, RelayClosed, RelayError};

/// Any failure of one proxied WebSocket session.
#[derive(Debug, thiserror::Error)]
pub enum WebSocketError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Dial(#[from] DialError),

    #[error(transparent)]
    Hijack(#[from] HijackError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl WebSocketError {
    /// Stage label used for metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            WebSocketError::Target(_) => "target",
            WebSocketError::Dial(_) => "dial",
            WebSocketError::Hijack(_) => "hijack",
            WebSocketError::Handshake(_) => "handshake",
            WebSocketError::Relay(_) => "relay",
        }
    }
}

/// Outcome of a session that reached the relay stage and ended cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Status the client received for its upgrade request.
    pub status: u16,
    /// Which side closed first, in client/destination terms.
    pub closed_by: Side,
    /// Bytes copied in the closing direction.
    pub bytes: u64,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Destination,
}

impl Side {
    fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::AToB => Side::Client,
            Direction::BToA => Side::Destination,
        }
    }

    fn metric_label(&self) -> &'static str {
        match self {
            Side::Client => "client_to_destination",
            Side::Destination => "destination_to_client",
        }
    }
}

/// Relays WebSocket upgrades to their destinations.
#[derive(Clone)]
pub struct WebSocketProxy {
    dialer: Dialer,
    filter: Arc<dyn ResponseFilter>,
    handshake_timeout: Duration,
}

impl WebSocketProxy {
    pub fn new(dialer: Dialer, filter: Arc<dyn ResponseFilter>, handshake_timeout: Duration) -> Self {
        Self {
            dialer,
            filter,
            handshake_timeout,
        }
    }

    /// Build the dialer and header filter from configuration.
    pub fn from_config(config: &RelayConfig) -> Result<Self, DialError> {
        let dialer = Dialer::from_config(config)?;
        let rewrite = HeaderRewriteFilter::from_config(&config.filter);
        let filter: Arc<dyn ResponseFilter> = if rewrite.is_empty() {
            Arc::new(IdentityFilter)
        } else {
            Arc::new(rewrite)
        };
        Ok(Self::new(dialer, filter, config.timeouts.handshake()))
    }

    /// Proxy one upgrade request end to end.
    ///
    /// The destination is dialed before the client is hijacked, so a dial
    /// failure leaves the client untouched for the caller to close. Every
    /// failure has already been reported through `ctx` when this returns.
    pub async fn serve<H>(
        &self,
        ctx: &ProxyContext,
        request: &Request,
        conn: &mut H,
    ) -> Result<SessionSummary, WebSocketError>
    where
        H: Hijack,
    {
        metrics::record_connection();
        let started = Instant::now();
        let result = self.run(ctx, request, conn, started).await;
        match &result {
            Ok(summary) => {
                metrics::record_relay_bytes(summary.closed_by.metric_label(), summary.bytes);
                metrics::record_session_duration(summary.duration);
                tracing::info!(
                    session_id = %ctx.session_id,
                    connection_id = %ctx.connection_id,
                    status = summary.status,
                    closed_by = ?summary.closed_by,
                    bytes = summary.bytes,
                    duration_ms = summary.duration.as_millis() as u64,
                    "Websocket session closed"
                );
            }
            Err(e) => {
                metrics::record_failure(e.stage());
                metrics::record_session_duration(started.elapsed());
            }
        }
        result
    }

    async fn run<H>(
        &self,
        ctx: &ProxyContext,
        request: &Request,
        conn: &mut H,
        started: Instant,
    ) -> Result<SessionSummary, WebSocketError>
    where
        H: Hijack,
    {
        let mut state = ConnectionState::Idle;

        let target = Target::from_request(request, conn.is_tls()).map_err(|e| {
            ctx_warn!(ctx, "Error resolving websocket target: {}", e);
            e
        })?;

        advance(ctx, &mut state, ConnectionState::Dialing);
        let user_agent = request
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok());
        let destination = self.dialer.dial(&target, user_agent).await.map_err(|e| {
            ctx_warn!(ctx, "Error dialing websocket backend {}: {}", target, e);
            e
        })?;

        // Dropping `destination` on any early return closes it.
        let hijacked = conn.hijack().map_err(|e| {
            ctx_warn!(ctx, "Error hijacking client connection: {}", e);
            e
        })?;
        let mut client = Prebuffered::with_initial(hijacked.stream, &hijacked.buffered);

        advance(ctx, &mut state, ConnectionState::Handshaking);
        let handshake = match perform_handshake(
            ctx,
            request,
            destination,
            &mut client,
            self.filter.as_ref(),
            self.handshake_timeout,
        )
        .await
        {
            Ok(handshake) => handshake,
            Err(e) => {
                shutdown(&mut client).await;
                return Err(e.into());
            }
        };
        let status = handshake.response.status.as_u16();
        let mut destination = handshake.destination;

        advance(ctx, &mut state, ConnectionState::Relaying);
        let outcome = relay(&mut client, &mut destination).await;

        shutdown(&mut client).await;
        shutdown(&mut destination).await;
        advance(ctx, &mut state, ConnectionState::Closed);

        match outcome {
            Ok(RelayClosed { direction, bytes }) => Ok(SessionSummary {
                status,
                closed_by: Side::from_direction(direction),
                bytes,
                duration: started.elapsed(),
            }),
            Err(e) => {
                ctx_warn!(ctx, "Websocket error: {}", e);
                Err(e.into())
            }
        }
    }
}

fn advance(ctx: &ProxyContext, state: &mut ConnectionState, next: ConnectionState) {
    debug_assert!(state.can_transition_to(next), "{} -> {}", state, next);
    tracing::trace!(
        session_id = %ctx.session_id,
        from = %state,
        to = %next,
        "Websocket state transition"
    );
    *state = next;
}

async fn shutdown<S: AsyncWrite + Unpin>(stream: &mut S) {
    if let Err(e) = stream.shutdown().await {
        tracing::trace!(error = %e, "Stream shutdown failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_stages() {
        let e: WebSocketError = TargetError::MissingHost.into();
        assert_eq!(e.stage(), "target");
        let e: WebSocketError = HijackError::AlreadyHijacked.into();
        assert_eq!(e.stage(), "hijack");
        let e: WebSocketError = DialError::Timeout(Duration::from_secs(1)).into();
        assert_eq!(e.stage(), "dial");
    }

    #[test]
    fn directions_map_to_sides() {
        assert_eq!(Side::from_direction(Direction::AToB), Side::Client);
        assert_eq!(Side::from_direction(Direction::BToA), Side::Destination);
    }
}
