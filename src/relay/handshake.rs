//! Upgrade handshake exchange with the destination.
//!
//! # Data Flow
//! ```text
//! client Request ──origin form──▶ destination
//! destination ──read head + framed body──▶ Response
//!     → ResponseFilter (may rewrite or replace)
//!     → written verbatim to the client
//! ```
//!
//! The response is handed to the filter even when it is not a 101; the
//! caller decides what to do next. Bytes the destination sends after the
//! response stay buffered in the returned stream and reach the client
//! through the relay.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

use crate::ctx_warn;
use crate::http::message::{MessageError, Request, Response};
use crate::http::prebuffered::Prebuffered;
use crate::proxy::context::ProxyContext;
use crate::proxy::filter::ResponseFilter;

/// Failures while exchanging the upgrade handshake.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("failed writing upgrade request to destination: {0}")]
    WriteRequest(#[source] io::Error),

    #[error("failed reading handshake response: {0}")]
    Read(#[source] MessageError),

    #[error("failed writing handshake response to client: {0}")]
    WriteResponse(#[source] io::Error),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
}

impl HandshakeError {
    /// True for the two write-side failures.
    pub fn is_write(&self) -> bool {
        matches!(self, HandshakeError::WriteRequest(_) | HandshakeError::WriteResponse(_))
    }
}

/// Result of a completed handshake.
pub struct Handshake<D> {
    /// Destination stream, carrying any bytes read past the response.
    pub destination: Prebuffered<D>,
    /// The response as delivered to the client, after filtering.
    pub response: Response,
}

/// Forward `request` to `destination`, read its response, run it through
/// `filter` and write the result to `client`.
///
/// Every failure is reported once through `ctx` before returning. On error
/// `destination` has been dropped.
pub async fn perform_handshake<D, C>(
    ctx: &ProxyContext,
    request: &Request,
    destination: D,
    client: &mut C,
    filter: &dyn ResponseFilter,
    timeout: Duration,
) -> Result<Handshake<D>, HandshakeError>
where
    D: AsyncRead + AsyncWrite + Unpin,
    C: AsyncWrite + Unpin,
{
    let result = exchange(ctx, request, destination, client, filter, timeout).await;
    if let Err(e) = &result {
        match e {
            HandshakeError::WriteRequest(_) | HandshakeError::WriteResponse(_) => {
                ctx_warn!(ctx, "Error writing handshake: {}", e)
            }
            HandshakeError::Read(_) => ctx_warn!(ctx, "Error reading handshake response: {}", e),
            HandshakeError::Timeout(_) => ctx_warn!(ctx, "Websocket handshake timed out: {}", e),
        }
    }
    result
}

async fn exchange<D, C>(
    ctx: &ProxyContext,
    request: &Request,
    destination: D,
    client: &mut C,
    filter: &dyn ResponseFilter,
    timeout: Duration,
) -> Result<Handshake<D>, HandshakeError>
where
    D: AsyncRead + AsyncWrite + Unpin,
    C: AsyncWrite + Unpin,
{
    let deadline = Instant::now() + timeout;
    let mut destination = Prebuffered::new(destination);

    let forwarded = request.to_origin_form();
    tokio::time::timeout_at(deadline, forwarded.write_to(&mut destination))
        .await
        .map_err(|_| HandshakeError::Timeout(timeout))?
        .map_err(HandshakeError::WriteRequest)?;

    let response = tokio::time::timeout_at(deadline, Response::read(&mut destination, &request.method))
        .await
        .map_err(|_| HandshakeError::Timeout(timeout))?
        .map_err(HandshakeError::Read)?;

    tracing::debug!(
        session_id = %ctx.session_id,
        status = response.status.as_u16(),
        leftover = destination.buffer().len(),
        "Handshake response received"
    );

    let response = filter.filter(response, ctx);

    tokio::time::timeout_at(deadline, response.write_to(client))
        .await
        .map_err(|_| HandshakeError::Timeout(timeout))?
        .map_err(HandshakeError::WriteResponse)?;

    Ok(Handshake { destination, response })
}
