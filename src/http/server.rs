//! Front-end HTTP server for the relay.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Terminate inbound TLS when configured
//! - Read one request head per connection
//! - Hand upgrade requests to the WebSocket proxy; refuse everything else
//! - Stop accepting on shutdown

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use rustls::ServerConfig;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use crate::config::RelayConfig;
use crate::dial::DialError;
use crate::http::message::{MessageError, Request, Response};
use crate::http::prebuffered::Prebuffered;
use crate::http::upgrade::is_upgrade_request;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::net::tls::{load_server_config, TlsSetupError};
use crate::proxy::context::{DiagnosticSink, ProxyContext, TracingSink};
use crate::proxy::hijack::HijackSlot;
use crate::proxy::websocket::WebSocketProxy;

/// Error type for server setup and the accept loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsSetupError),

    #[error("dialer setup failed: {0}")]
    Dialer(#[from] DialError),
}

/// An accepted client transport.
#[derive(Debug)]
pub enum ClientStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ClientStream {
    pub fn is_tls(&self) -> bool {
        matches!(self, ClientStream::Tls(_))
    }
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ClientStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(s) => Pin::new(s).poll_flush(cx),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// The relay's front end.
pub struct RelayServer {
    proxy: WebSocketProxy,
    acceptor: Option<TlsAcceptor>,
    sink: Arc<dyn DiagnosticSink>,
    tracker: ConnectionTracker,
    request_timeout: Duration,
}

impl RelayServer {
    pub fn new(proxy: WebSocketProxy) -> Self {
        Self {
            proxy,
            acceptor: None,
            sink: Arc::new(TracingSink),
            tracker: ConnectionTracker::new(),
            request_timeout: Duration::from_secs(45),
        }
    }

    /// Build the proxy and, if configured, the inbound TLS acceptor.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ServerError> {
        let mut server = Self::new(WebSocketProxy::from_config(config)?)
            .with_request_timeout(config.timeouts.handshake());
        if let Some(tls) = &config.listener.tls {
            let server_config = load_server_config(Path::new(&tls.cert_path), Path::new(&tls.key_path))?;
            server = server.with_tls(server_config);
        }
        Ok(server)
    }

    /// Terminate TLS on inbound connections.
    pub fn with_tls(mut self, config: Arc<ServerConfig>) -> Self {
        self.acceptor = Some(TlsAcceptor::from(config));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Bound on TLS accept plus reading the request head.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Live connection counter, shared with the running server.
    pub fn connections(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// Connections already accepted keep running; use
    /// [`ConnectionTracker::wait_for_drain`] to wait for them.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(
            address = %addr,
            tls = self.acceptor.is_some(),
            "Relay server starting"
        );

        let server = Arc::new(self);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Relay server stopping");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = server.tracker.track();
                        let server = Arc::clone(&server);
                        tokio::spawn(async move {
                            server.handle_connection(stream, peer, guard, permit).await;
                        });
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                },
            }
        }

        tracing::info!("Relay server stopped");
        Ok(())
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        guard: ConnectionGuard,
        _permit: ConnectionPermit,
    ) {
        stream.set_nodelay(true).ok();
        let connection_id = guard.id();

        let client = match &self.acceptor {
            Some(acceptor) => match tokio::time::timeout(self.request_timeout, acceptor.accept(stream)).await {
                Ok(Ok(tls)) => ClientStream::Tls(Box::new(tls)),
                Ok(Err(e)) => {
                    tracing::debug!(%connection_id, peer_addr = %peer, error = %e, "Inbound TLS handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(%connection_id, peer_addr = %peer, "Inbound TLS handshake timed out");
                    return;
                }
            },
            None => ClientStream::Plain(stream),
        };
        let tls = client.is_tls();

        let mut reader = Prebuffered::new(client);
        let request = match tokio::time::timeout(self.request_timeout, Request::read(&mut reader)).await {
            Ok(Ok(request)) => request,
            Ok(Err(e)) => {
                tracing::debug!(%connection_id, peer_addr = %peer, error = %e, "Failed to read request");
                match e {
                    MessageError::Io(_) => {}
                    MessageError::BodyTooLarge { .. } => {
                        respond(&mut reader, StatusCode::PAYLOAD_TOO_LARGE, "request body too large\n").await
                    }
                    _ => respond(&mut reader, StatusCode::BAD_REQUEST, "malformed request\n").await,
                }
                return;
            }
            Err(_) => {
                tracing::debug!(%connection_id, peer_addr = %peer, "Timed out reading request");
                return;
            }
        };

        tracing::debug!(
            %connection_id,
            peer_addr = %peer,
            method = %request.method,
            uri = %request.uri,
            tls,
            "Request received"
        );

        if !is_upgrade_request(&request.headers) {
            respond(&mut reader, StatusCode::NOT_IMPLEMENTED, "only websocket upgrades are relayed\n").await;
            return;
        }

        let ctx = ProxyContext::with_sink(connection_id, Some(peer), Arc::clone(&self.sink));
        let (buffered, stream) = reader.into_parts();
        let mut conn = HijackSlot::new(stream, buffered, tls);

        if let Err(e) = self.proxy.serve(&ctx, &request, &mut conn).await {
            tracing::debug!(
                session_id = %ctx.session_id,
                %connection_id,
                stage = e.stage(),
                "Websocket session failed"
            );
        }

        // Never hijacked: close without writing anything.
        if let Some(stream) = conn.stream_mut() {
            stream.shutdown().await.ok();
        }
    }
}

async fn respond<S>(stream: &mut S, status: StatusCode, body: &'static str)
where
    S: AsyncWrite + Unpin,
{
    let mut response = Response::new(status);
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    response.headers.insert(CONNECTION, HeaderValue::from_static("close"));
    response.body = Bytes::from_static(body.as_bytes());
    if response.write_to(stream).await.is_ok() {
        stream.shutdown().await.ok();
    }
}
