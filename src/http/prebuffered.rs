//! Read-ahead buffer that never loses bytes.
//!
//! # Responsibilities
//! - Accumulate bytes while an HTTP head is being parsed
//! - Let the parser consume exactly the head (and body) it framed
//! - Serve any remaining buffered bytes before reading the transport again
//! - Pass writes straight through, so one value stays a full duplex stream
//!
//! # Design Decisions
//! - The head parser and the relay share the same wrapper, so bytes read past
//!   a response during the handshake reach the data phase.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};

const INITIAL_CAPACITY: usize = 4 * 1024;

/// A prebuffering wrapper around a transport.
#[derive(Debug)]
pub struct Prebuffered<S> {
    inner: S,
    buf: BytesMut,
}

impl<S> Prebuffered<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Wrap a transport whose first bytes were already read by someone else.
    pub fn with_initial(inner: S, initial: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(INITIAL_CAPACITY.max(initial.len()));
        buf.extend_from_slice(initial);
        Self { inner, buf }
    }

    /// Unconsumed buffered bytes.
    pub fn buffer(&self) -> &[u8] {
        &self.buf[..]
    }

    /// Drop `n` bytes from the front of the buffer.
    pub fn discard(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        let _ = self.buf.split_to(n);
    }

    /// Remove and return `n` bytes from the front of the buffer.
    pub fn take(&mut self, n: usize) -> Bytes {
        let n = n.min(self.buf.len());
        self.buf.split_to(n).freeze()
    }

    /// Split into leftover bytes and the transport.
    pub fn into_parts(self) -> (Bytes, S) {
        (self.buf.freeze(), self.inner)
    }
}

impl<S: AsyncRead + Unpin> Prebuffered<S> {
    /// Read more bytes from the transport into the buffer, up to `limit`
    /// total buffered bytes. Returns 0 on EOF or when the limit is reached.
    pub async fn buffer_more(&mut self, limit: usize) -> io::Result<usize> {
        let max = limit.saturating_sub(self.buf.len());
        if max == 0 {
            return Ok(0);
        }
        (&mut self.inner).take(max as u64).read_buf(&mut self.buf).await
    }

    /// Ensure at least `n` bytes are buffered.
    pub async fn fill_to(&mut self, n: usize) -> io::Result<()> {
        while self.buf.len() < n {
            if self.buffer_more(n).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-message",
                ));
            }
        }
        Ok(())
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Prebuffered<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if out.remaining() == 0 {
            Poll::Ready(Ok(()))
        } else if !self.buf.is_empty() {
            let n = self.buf.len().min(out.remaining());
            let chunk = self.buf.split_to(n);
            out.put_slice(&chunk);
            Poll::Ready(Ok(()))
        } else {
            Pin::new(&mut self.inner).poll_read(cx, out)
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Prebuffered<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, data)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
