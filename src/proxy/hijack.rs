//! Taking over the raw client connection.
//!
//! Once the relay owns the client stream the HTTP layer must not write to
//! it again. Bytes the HTTP layer already read past the request head travel
//! with the stream so the relay can forward them first.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

/// Why the client connection could not be taken over.
#[derive(Debug, thiserror::Error)]
pub enum HijackError {
    #[error("connection already hijacked")]
    AlreadyHijacked,

    #[error("connection does not support hijacking: {0}")]
    Unsupported(String),
}

/// A connection released by the HTTP layer.
#[derive(Debug)]
pub struct Hijacked<S> {
    pub stream: S,
    /// Bytes already read from `stream` that belong to the client's side of
    /// the conversation.
    pub buffered: Bytes,
}

/// An inbound connection that can hand over its raw stream.
pub trait Hijack {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Whether the inbound connection terminated TLS at the proxy.
    fn is_tls(&self) -> bool;

    /// Detach the raw stream. Succeeds at most once.
    fn hijack(&mut self) -> Result<Hijacked<Self::Stream>, HijackError>;
}

/// Holds a stream until it is hijacked.
#[derive(Debug)]
pub struct HijackSlot<S> {
    inner: Option<Hijacked<S>>,
    tls: bool,
}

impl<S> HijackSlot<S> {
    pub fn new(stream: S, buffered: Bytes, tls: bool) -> Self {
        Self {
            inner: Some(Hijacked { stream, buffered }),
            tls,
        }
    }

    pub fn is_hijacked(&self) -> bool {
        self.inner.is_none()
    }

    /// Access the stream while it is still owned by the HTTP layer.
    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.inner.as_mut().map(|h| &mut h.stream)
    }
}

impl<S> Hijack for HijackSlot<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Stream = S;

    fn is_tls(&self) -> bool {
        self.tls
    }

    fn hijack(&mut self) -> Result<Hijacked<S>, HijackError> {
        self.inner.take().ok_or(HijackError::AlreadyHijacked)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;

    #[test]
    fn hijack_succeeds_once() {
        let (stream, _peer) = duplex(16);
        let mut slot = HijackSlot::new(stream, Bytes::from_static(b"early"), true);
        assert!(slot.is_tls());
        assert!(!slot.is_hijacked());

        let hijacked = slot.hijack().unwrap();
        assert_eq!(&hijacked.buffered[..], b"early");
        assert!(slot.is_hijacked());
        assert!(slot.stream_mut().is_none());
        assert!(matches!(slot.hijack(), Err(HijackError::AlreadyHijacked)));
    }
}
