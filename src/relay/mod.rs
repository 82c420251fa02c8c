//! Handshake and byte relay between a hijacked client and its destination.
//!
//! # Data Flow
//! ```text
//! hijacked client ─┐                         ┌─ dialed destination
//!                  ├─ handshake.rs (once) ───┤
//!                  └─ duplex.rs (both ways) ─┘
//! ```

pub mod duplex;
pub mod handshake;

pub use duplex::{relay, Direction, RelayClosed, RelayError};
pub use handshake::{perform_handshake, Handshake, HandshakeError};
