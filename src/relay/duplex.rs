//! Bidirectional byte pump.
//!
//! Two copies run concurrently, one per direction. The relay returns as soon
//! as either copy finishes: the reporting side closed or failed, and the
//! caller tears both streams down. The other copy is dropped in place, so
//! nothing outlives the call.

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

/// Which copy finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes read from the first stream, written to the second.
    AToB,
    /// Bytes read from the second stream, written to the first.
    BToA,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::AToB => "a_to_b",
            Direction::BToA => "b_to_a",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A direction reached end of stream cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayClosed {
    pub direction: Direction,
    /// Bytes copied in that direction before it ended.
    pub bytes: u64,
}

/// A direction failed with an I/O error.
#[derive(Debug, thiserror::Error)]
#[error("relay {direction} failed: {source}")]
pub struct RelayError {
    pub direction: Direction,
    #[source]
    pub source: io::Error,
}

/// Copy bytes between `a` and `b` in both directions until one direction
/// ends.
///
/// Bytes are forwarded in order without inspection. Neither stream is shut
/// down here.
pub async fn relay<A, B>(a: &mut A, b: &mut B) -> Result<RelayClosed, RelayError>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut a_read, mut a_write) = tokio::io::split(a);
    let (mut b_read, mut b_write) = tokio::io::split(b);

    let (direction, result) = tokio::select! {
        result = tokio::io::copy(&mut a_read, &mut b_write) => (Direction::AToB, result),
        result = tokio::io::copy(&mut b_read, &mut a_write) => (Direction::BToA, result),
    };

    match result {
        Ok(bytes) => {
            tracing::debug!(%direction, bytes, "Relay direction closed");
            Ok(RelayClosed { direction, bytes })
        }
        Err(source) => Err(RelayError { direction, source }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn forwards_bytes_both_ways() {
        let (mut a, mut a_peer) = duplex(64);
        let (mut b, mut b_peer) = duplex(64);

        let pump = tokio::spawn(async move { relay(&mut a, &mut b).await });

        a_peer.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        b_peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        b_peer.write_all(b"pong").await.unwrap();
        a_peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(a_peer);
        let closed = pump.await.unwrap().unwrap();
        // Either copy may be the one to finish; each carried four bytes.
        assert_eq!(closed.bytes, 4);
        drop(b_peer);
    }

    #[tokio::test]
    async fn returns_when_one_side_closes_while_other_is_silent() {
        let (mut a, a_peer) = duplex(64);
        let (mut b, _b_peer) = duplex(64);

        drop(a_peer);
        let closed = tokio::time::timeout(Duration::from_secs(1), relay(&mut a, &mut b))
            .await
            .expect("relay must not wait for the silent side")
            .unwrap();
        assert_eq!(closed.direction, Direction::AToB);
        assert_eq!(closed.bytes, 0);
    }

    #[tokio::test]
    async fn destination_close_is_reported_as_b_to_a() {
        let (mut a, _a_peer) = duplex(64);
        let (mut b, mut b_peer) = duplex(64);

        b_peer.write_all(b"bye").await.unwrap();
        drop(b_peer);
        let closed = relay(&mut a, &mut b).await.unwrap();
        assert_eq!(closed.direction, Direction::BToA);
        assert_eq!(closed.bytes, 3);
    }
}
