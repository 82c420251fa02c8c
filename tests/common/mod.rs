//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

use ws_mitm_relay::config::RelayConfig;
use ws_mitm_relay::dial::{Dialer, DialerConfig};
use ws_mitm_relay::http::RelayServer;
use ws_mitm_relay::lifecycle::{start_server, Running};
use ws_mitm_relay::net::tls::{client_config_with_roots, provider};
use ws_mitm_relay::proxy::{DiagnosticSink, IdentityFilter, ProxyContext, ResponseFilter, WebSocketProxy};

/// Self-signed certificate for `localhost`.
pub struct TestCert {
    pub cert: CertificateDer<'static>,
    key: Vec<u8>,
}

impl TestCert {
    pub fn generate() -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        Self {
            cert: certified.cert.der().clone(),
            key: certified.key_pair.serialize_der(),
        }
    }

    pub fn key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.clone()))
    }

    pub fn server_config(&self) -> Arc<ServerConfig> {
        let config = ServerConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![self.cert.clone()], self.key())
            .unwrap();
        Arc::new(config)
    }

    /// Client configuration that trusts only this certificate.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        let mut roots = RootCertStore::empty();
        roots.add(self.cert.clone()).unwrap();
        client_config_with_roots(roots).unwrap()
    }
}

/// Diagnostics sink that keeps every warning.
#[derive(Default)]
pub struct RecordingSink {
    warnings: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn warn(&self, _ctx: &ProxyContext, message: fmt::Arguments<'_>) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn echo_websocket<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    while let Some(Ok(message)) = ws.next().await {
        if message.is_close() {
            break;
        }
        if message.is_text() || message.is_binary() {
            if ws.send(message).await.is_err() {
                break;
            }
        }
    }
}

/// Start a WebSocket server that echoes every data frame.
pub async fn start_ws_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(echo_websocket(socket));
        }
    });
    addr
}

/// Start a WebSocket echo server behind TLS.
pub async fn start_tls_ws_echo_backend(config: Arc<ServerConfig>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let acceptor = TlsAcceptor::from(config);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(tls) = acceptor.accept(socket).await {
                    echo_websocket(tls).await;
                }
            });
        }
    });
    addr
}

/// Start a CONNECT proxy that records each request head and then tunnels.
pub async fn start_connect_proxy() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(tunnel(socket, Arc::clone(&record)));
        }
    });
    (addr, seen)
}

/// The same CONNECT proxy, reached over TLS with `config`.
pub async fn start_tls_connect_proxy(config: Arc<ServerConfig>) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let acceptor = TlsAcceptor::from(config);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let record = Arc::clone(&record);
            tokio::spawn(async move {
                if let Ok(tls) = acceptor.accept(socket).await {
                    tunnel(tls, record).await;
                }
            });
        }
    });
    (addr, seen)
}

async fn tunnel<S>(mut socket: S, record: Arc<Mutex<Vec<String>>>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if socket.read(&mut byte).await.unwrap_or(0) == 0 {
            return;
        }
        head.push(byte[0]);
    }
    let head = String::from_utf8_lossy(&head).to_string();
    record.lock().unwrap().push(head.clone());

    let authority = head.split_whitespace().nth(1).unwrap_or_default().to_string();
    let Ok(mut upstream) = TcpStream::connect(&authority).await else {
        let _ = socket.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
        return;
    };
    let _ = socket.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n").await;
    let _ = socket.flush().await;
    let _ = tokio::io::copy_bidirectional(&mut socket, &mut upstream).await;
}

/// Relay configuration bound to an ephemeral local port.
pub fn relay_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// A WebSocket proxy with no trust roots beyond `tls`.
pub fn websocket_proxy(dialer: DialerConfig, filter: Arc<dyn ResponseFilter>) -> WebSocketProxy {
    WebSocketProxy::new(Dialer::new(dialer), filter, Duration::from_secs(5))
}

/// Start a plaintext relay that dials with `dialer`.
pub async fn start_relay(dialer: DialerConfig, sink: Arc<dyn DiagnosticSink>) -> Running {
    let server = RelayServer::new(websocket_proxy(dialer, Arc::new(IdentityFilter))).with_sink(sink);
    start_server(&relay_config(), server).await.unwrap()
}

/// Dialer settings that trust nothing; fine for plaintext destinations.
pub fn plain_dialer() -> DialerConfig {
    DialerConfig::new(client_config_with_roots(RootCertStore::empty()).unwrap())
        .with_dial_timeout(Duration::from_secs(5))
}
