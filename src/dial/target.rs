//! Destination addressing.

use std::fmt;

use http::uri::Authority;

use crate::http::message::Request;

/// Scheme a destination is reached with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
    Http,
    Https,
}

impl Scheme {
    /// Scheme for a WebSocket upgrade arriving over TLS (`wss`) or plaintext (`ws`).
    pub fn for_inbound(inbound_tls: bool) -> Self {
        if inbound_tls {
            Scheme::Wss
        } else {
            Scheme::Ws
        }
    }

    /// Secure schemes must be dialed over TLS, others never are.
    pub fn is_secure(self) -> bool {
        matches!(self, Scheme::Wss | Scheme::Https)
    }

    pub fn default_port(self) -> u16 {
        if self.is_secure() {
            443
        } else {
            80
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors deriving a target from a request.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("request names no destination host")]
    MissingHost,

    #[error("invalid destination authority {0:?}")]
    InvalidAuthority(String),
}

/// Where an upgrade request is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Target {
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// Derive the destination of `request`.
    ///
    /// The host comes from an absolute-form request target, falling back to
    /// the `Host` header. The scheme follows the inbound transport, not the
    /// request line.
    pub fn from_request(request: &Request, inbound_tls: bool) -> Result<Self, TargetError> {
        let scheme = Scheme::for_inbound(inbound_tls);
        let authority = match request.uri.authority() {
            Some(authority) => authority.clone(),
            None => {
                let host = request
                    .headers
                    .get(http::header::HOST)
                    .ok_or(TargetError::MissingHost)?;
                let host = host
                    .to_str()
                    .map_err(|_| TargetError::InvalidAuthority(format!("{:?}", host)))?;
                host.parse::<Authority>()
                    .map_err(|_| TargetError::InvalidAuthority(host.to_string()))?
            }
        };
        if authority.host().is_empty() {
            return Err(TargetError::MissingHost);
        }
        Ok(Self {
            scheme,
            host: authority.host().to_string(),
            port: authority.port_u16().unwrap_or_else(|| scheme.default_port()),
            path: request.uri.path().to_string(),
        })
    }

    /// `host:port` for socket connects and CONNECT requests.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Host without IPv6 brackets, as used for TLS server names.
    pub fn server_name(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}
