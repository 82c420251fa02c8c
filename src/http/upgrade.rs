//! Protocol-upgrade detection.

use http::header::{AsHeaderName, CONNECTION, UPGRADE};
use http::HeaderMap;

/// Whether any value of header `name` carries `token` in its comma-separated
/// list, compared case-insensitively after trimming.
///
/// Repeated header lines are each split on their own; an absent header never
/// matches.
pub fn header_contains<K: AsHeaderName>(headers: &HeaderMap, name: K, token: &str) -> bool {
    headers.get_all(name).iter().any(|value| {
        value
            .to_str()
            .map(|v| v.split(',').any(|s| s.trim().eq_ignore_ascii_case(token)))
            .unwrap_or(false)
    })
}

/// A request asks for a WebSocket upgrade when `Connection` lists `upgrade`
/// and `Upgrade` lists `websocket`.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    header_contains(headers, CONNECTION, "upgrade") && header_contains(headers, UPGRADE, "websocket")
}
