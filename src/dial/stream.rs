//! One stream type for every dial path.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// A connected destination transport.
///
/// `Tls` nests, so TLS to a destination through an HTTPS proxy tunnel is a
/// `Tls` wrapping a `Tls` wrapping a `Tcp`.
#[derive(Debug)]
pub enum DuplexStream {
    Tcp(TcpStream),
    Tls(Box<TlsStream<DuplexStream>>),
}

impl DuplexStream {
    /// Whether the outermost layer is a TLS session.
    pub fn is_tls(&self) -> bool {
        matches!(self, DuplexStream::Tls(_))
    }

    /// Number of TLS layers between the caller and the socket.
    pub fn tls_depth(&self) -> usize {
        match self {
            DuplexStream::Tcp(_) => 0,
            DuplexStream::Tls(tls) => 1 + tls.get_ref().0.tls_depth(),
        }
    }

    /// Address of the socket's remote end (the proxy when tunneled).
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            DuplexStream::Tcp(tcp) => tcp.peer_addr(),
            DuplexStream::Tls(tls) => tls.get_ref().0.peer_addr(),
        }
    }
}

impl AsyncRead for DuplexStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            DuplexStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            DuplexStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for DuplexStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            DuplexStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            DuplexStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            DuplexStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            DuplexStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            DuplexStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            DuplexStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
