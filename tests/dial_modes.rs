//! Dialing through an upstream proxy that is itself reached over TLS.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use ws_mitm_relay::dial::{Dialer, DialerConfig, Scheme, Target, UpstreamProxy};

mod common;

#[tokio::test]
async fn https_proxy_nests_destination_tls_inside_proxy_tls() {
    let cert = common::TestCert::generate();
    let backend = common::start_tls_ws_echo_backend(cert.server_config()).await;
    let (proxy_addr, seen) = common::start_tls_connect_proxy(cert.server_config()).await;

    let proxy = UpstreamProxy::parse(&format!("https://localhost:{}", proxy_addr.port())).unwrap();
    assert!(proxy.secure);
    let dialer = Dialer::new(
        DialerConfig::new(cert.client_config())
            .with_upstream(proxy)
            .with_server_name_override("localhost")
            .with_dial_timeout(Duration::from_secs(5)),
    );

    let target = Target::new(Scheme::Wss, "127.0.0.1", backend.port(), "/");
    let stream = dialer.dial(&target, Some("dial-test/1.0")).await.unwrap();
    assert!(stream.is_tls());
    assert_eq!(stream.tls_depth(), 2);
    assert_eq!(stream.peer_addr().unwrap(), proxy_addr);

    let heads = seen.lock().unwrap().clone();
    assert_eq!(heads.len(), 1);
    assert!(heads[0].starts_with(&format!("CONNECT 127.0.0.1:{} HTTP/1.1\r\n", backend.port())));
    assert!(heads[0].contains("User-Agent: dial-test/1.0\r\n"));

    // The nested stream carries a working WebSocket session.
    let (mut ws, _) = tokio_tungstenite::client_async("wss://localhost/", stream).await.unwrap();
    ws.send(Message::text("two layers")).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap(), Message::text("two layers"));
}
