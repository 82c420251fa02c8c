//! Handshake response filtering.
//!
//! The surrounding proxy's filter pipeline sees every handshake response
//! before the client does. A filter may edit the response or return a
//! different one; it must not block indefinitely.

use http::{HeaderName, HeaderValue};

use crate::config::FilterConfig;
use crate::http::message::Response;
use crate::proxy::context::ProxyContext;

/// Rewrites a handshake response.
pub trait ResponseFilter: Send + Sync {
    fn filter(&self, response: Response, ctx: &ProxyContext) -> Response;
}

/// Passes responses through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityFilter;

impl ResponseFilter for IdentityFilter {
    fn filter(&self, response: Response, _ctx: &ProxyContext) -> Response {
        response
    }
}

impl<F> ResponseFilter for F
where
    F: Fn(Response, &ProxyContext) -> Response + Send + Sync,
{
    fn filter(&self, response: Response, ctx: &ProxyContext) -> Response {
        self(response, ctx)
    }
}

/// Applies filters in order.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn ResponseFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, filter: impl ResponseFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl ResponseFilter for FilterChain {
    fn filter(&self, response: Response, ctx: &ProxyContext) -> Response {
        self.filters
            .iter()
            .fold(response, |response, filter| filter.filter(response, ctx))
    }
}

/// Sets and strips response headers.
#[derive(Debug, Clone, Default)]
pub struct HeaderRewriteFilter {
    set: Vec<(HeaderName, HeaderValue)>,
    remove: Vec<HeaderName>,
}

impl HeaderRewriteFilter {
    /// Build from configuration, skipping entries that are not valid header
    /// names or values (validation rejects them earlier).
    pub fn from_config(config: &FilterConfig) -> Self {
        let set = config
            .set_response_headers
            .iter()
            .filter_map(|(name, value)| {
                Some((
                    HeaderName::from_bytes(name.as_bytes()).ok()?,
                    HeaderValue::from_str(value).ok()?,
                ))
            })
            .collect();
        let remove = config
            .remove_response_headers
            .iter()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .collect();
        Self { set, remove }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }
}

impl ResponseFilter for HeaderRewriteFilter {
    fn filter(&self, mut response: Response, _ctx: &ProxyContext) -> Response {
        for name in &self.remove {
            response.headers.remove(name);
        }
        for (name, value) in &self.set {
            response.headers.insert(name.clone(), value.clone());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::net::connection::ConnectionId;

    fn ctx() -> ProxyContext {
        ProxyContext::new(ConnectionId::new(), None)
    }

    fn handshake_response() -> Response {
        let mut response = Response::new(StatusCode::SWITCHING_PROTOCOLS);
        response.headers.insert("upgrade", HeaderValue::from_static("websocket"));
        response.headers.insert("server", HeaderValue::from_static("origin/1.0"));
        response
    }

    #[test]
    fn identity_leaves_response_alone() {
        let before = handshake_response();
        let after = IdentityFilter.filter(before.clone(), &ctx());
        assert_eq!(after.to_bytes(), before.to_bytes());
    }

    #[test]
    fn closures_are_filters() {
        let filter = |mut response: Response, _: &ProxyContext| {
            response.status = StatusCode::FORBIDDEN;
            response
        };
        assert_eq!(filter.filter(handshake_response(), &ctx()).status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn header_rewrite_sets_and_removes() {
        let mut config = FilterConfig::default();
        config.set_response_headers.insert("x-intercepted".into(), "1".into());
        config.remove_response_headers.push("Server".into());
        let filter = HeaderRewriteFilter::from_config(&config);

        let response = filter.filter(handshake_response(), &ctx());
        assert_eq!(response.headers.get("x-intercepted").unwrap(), "1");
        assert!(response.headers.get("server").is_none());
        assert_eq!(response.headers.get("upgrade").unwrap(), "websocket");
    }

    #[test]
    fn chain_runs_in_order() {
        let chain = FilterChain::new()
            .push(|mut r: Response, _: &ProxyContext| {
                r.headers.insert("x-step", HeaderValue::from_static("one"));
                r
            })
            .push(|mut r: Response, _: &ProxyContext| {
                r.headers.insert("x-step", HeaderValue::from_static("two"));
                r
            });
        assert_eq!(chain.len(), 2);
        let response = chain.filter(handshake_response(), &ctx());
        assert_eq!(response.headers.get("x-step").unwrap(), "two");
    }
}
