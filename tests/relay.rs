//! Whole-process test: a [`Relay`] polling a local mock upstream and pushing
//! quotes to a real WebSocket viewer.

use std::time::Duration;

use futures_util::StreamExt;
use quote_relay::config::RelayConfigBuilder;
use quote_relay::relay::Relay;
use quote_relay::types::SymbolSet;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Helper: an upstream that answers every GLOBAL_QUOTE request with a quote
/// for the requested symbol, except `FAIL` which gets a rate-limit notice.
async fn mock_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let mut len = 0;
                while !buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut buf[len..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => len += n,
                    }
                }
                let request = String::from_utf8_lossy(&buf[..len]).into_owned();
                let symbol = request
                    .split(['?', '&', ' '])
                    .find_map(|part| part.strip_prefix("symbol="))
                    .unwrap_or("UNKNOWN")
                    .to_owned();

                let body = if symbol == "FAIL" {
                    r#"{"Note":"API call frequency exceeded"}"#.to_owned()
                } else {
                    format!(r#"{{"Global Quote":{{"01. symbol":"{symbol}","05. price":"101.2500"}}}}"#)
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_relay_polls_upstream_and_pushes_to_viewers() {
    let base_url = mock_upstream().await;
    let config = RelayConfigBuilder::new("test-key")
        .base_url(base_url)
        .host("127.0.0.1")
        .port(0)
        .symbols(SymbolSet::parse("AAPL,FAIL,MSFT").unwrap())
        .inter_symbol_delay(Duration::from_millis(50))
        .initial_delay(Duration::from_millis(500))
        .cycle_interval(Duration::from_secs(3600))
        .request_timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let relay = Relay::start(config).await.unwrap();
    let (mut ws, _) = connect_async(format!("ws://{}", relay.local_addr()))
        .await
        .expect("handshake");

    let mut symbols = Vec::new();
    while symbols.len() < 2 {
        let frame = tokio::time::timeout(Duration::from_secs(10), ws.next())
            .await
            .expect("quote within timeout")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = frame {
            let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(json["price"], "101.2500");
            symbols.push(json["symbol"].as_str().unwrap().to_owned());
        }
    }

    // The rate-limited symbol is skipped; the others arrive in polling order.
    assert_eq!(symbols, ["AAPL", "MSFT"]);
    assert_eq!(relay.registry().len(), 1);

    relay.shutdown();
}

#[tokio::test]
async fn test_relay_refuses_to_start_with_invalid_config() {
    let mut config = RelayConfigBuilder::new("key").port(0).build().unwrap();
    config.request_timeout = Duration::ZERO;
    assert!(Relay::start(config).await.is_err());
}

#[tokio::test]
async fn test_shutdown_closes_viewer_connections() {
    let config = RelayConfigBuilder::new("test-key")
        .host("127.0.0.1")
        .port(0)
        .initial_delay(Duration::from_secs(3600))
        .build()
        .unwrap();

    let relay = Relay::start(config).await.unwrap();
    let registry = relay.registry().clone();
    let (mut ws, _) = connect_async(format!("ws://{}", relay.local_addr()))
        .await
        .expect("handshake");

    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.len() != 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("viewer registered");

    relay.shutdown();
    drop(relay);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry empties after shutdown");

    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Text(text))) => panic!("unexpected frame after shutdown: {text}"),
                _ => return,
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "viewer stream ends after shutdown");
}
