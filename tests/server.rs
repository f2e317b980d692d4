//! End-to-end push channel tests over real sockets: a [`RelayServer`] bound
//! to an ephemeral port and `tokio-tungstenite` clients connected to it.
//!
//! ```sh
//! cargo test --test server
//! ```

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use quote_relay::error::RelayError;
use quote_relay::types::Quote;
use quote_relay::ws::broadcaster::Broadcaster;
use quote_relay::ws::registry::ConnectionRegistry;
use quote_relay::ws::server::{RelayServer, SessionConfig};
use rust_decimal::Decimal;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

/// Helper: start a server on an ephemeral port.
async fn start_server() -> (SocketAddr, Arc<ConnectionRegistry>, JoinHandle<()>) {
    let registry = Arc::new(ConnectionRegistry::new());
    let server = RelayServer::bind("127.0.0.1:0", registry.clone()).await.unwrap();
    let addr = server.local_addr().unwrap();
    (addr, registry, server.spawn())
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _resp) = connect_async(format!("ws://{addr}")).await.expect("handshake");
    ws
}

/// Helper: poll until the registry holds exactly `n` connections.
async fn wait_for_clients(registry: &ConnectionRegistry, n: usize) {
    tokio::time::timeout(WAIT, async {
        while registry.len() != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {n} clients, have {}", registry.len()));
}

/// Helper: next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut Client) -> serde_json::Value {
    tokio::time::timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).expect("frame is JSON");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    })
    .await
    .expect("frame within timeout")
}

fn quote(symbol: &str, price: &str) -> Quote {
    Quote::new(symbol, Decimal::from_str(price).unwrap(), Utc::now())
}

// ===================================================================
// Broadcast delivery
// ===================================================================

#[tokio::test]
async fn test_connected_client_receives_broadcast() {
    let (addr, registry, _server) = start_server().await;
    let broadcaster = Broadcaster::new(registry.clone());

    let mut ws = connect(addr).await;
    wait_for_clients(&registry, 1).await;

    let report = broadcaster.broadcast(&quote("AAPL", "189.84")).unwrap();
    assert_eq!(report.delivered, 1);

    let json = next_json(&mut ws).await;
    assert_eq!(json["symbol"], "AAPL");
    assert_eq!(json["price"], "189.84");
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_quotes_arrive_in_broadcast_order() {
    let (addr, registry, _server) = start_server().await;
    let broadcaster = Broadcaster::new(registry.clone());

    let mut ws = connect(addr).await;
    wait_for_clients(&registry, 1).await;

    for symbol in ["AAPL", "GOOGL", "MSFT"] {
        broadcaster.broadcast(&quote(symbol, "100")).unwrap();
    }

    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(next_json(&mut ws).await["symbol"].as_str().unwrap().to_owned());
    }
    assert_eq!(seen, ["AAPL", "GOOGL", "MSFT"]);
}

#[tokio::test]
async fn test_disconnected_client_is_dropped_and_others_still_served() {
    let (addr, registry, _server) = start_server().await;
    let broadcaster = Broadcaster::new(registry.clone());

    let mut stays = connect(addr).await;
    let mut leaves = connect(addr).await;
    wait_for_clients(&registry, 2).await;

    leaves.close(None).await.unwrap();
    wait_for_clients(&registry, 1).await;

    let report = broadcaster.broadcast(&quote("TSLA", "250.00")).unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(next_json(&mut stays).await["symbol"], "TSLA");
}

#[tokio::test]
async fn test_abrupt_disconnect_is_deregistered() {
    let (addr, registry, _server) = start_server().await;

    let ws = connect(addr).await;
    wait_for_clients(&registry, 1).await;

    // No close handshake: just drop the socket.
    drop(ws);
    wait_for_clients(&registry, 0).await;
}

#[tokio::test]
async fn test_late_joiner_gets_no_replay() {
    let (addr, registry, _server) = start_server().await;
    let broadcaster = Broadcaster::new(registry.clone());

    broadcaster.broadcast(&quote("AAPL", "189.84")).unwrap();

    let mut ws = connect(addr).await;
    wait_for_clients(&registry, 1).await;
    broadcaster.broadcast(&quote("AMZN", "178.25")).unwrap();

    assert_eq!(next_json(&mut ws).await["symbol"], "AMZN");
}

// ===================================================================
// Control messages
// ===================================================================

#[tokio::test]
async fn test_subscribe_is_acknowledged() {
    let (addr, registry, _server) = start_server().await;
    let mut ws = connect(addr).await;
    wait_for_clients(&registry, 1).await;

    ws.send(Message::Text(
        r#"{"type":"subscribe","symbols":["AAPL","MSFT"]}"#.into(),
    ))
    .await
    .unwrap();

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "subscription_confirmed");
    assert_eq!(reply["symbols"], serde_json::json!(["AAPL", "MSFT"]));

    ws.send(Message::Text(r#"{"type":"unsubscribe","symbols":["MSFT"]}"#.into()))
        .await
        .unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "unsubscription_confirmed");
    assert_eq!(reply["symbols"], serde_json::json!(["MSFT"]));
}

#[tokio::test]
async fn test_subscribe_does_not_filter_the_feed() {
    let (addr, registry, _server) = start_server().await;
    let broadcaster = Broadcaster::new(registry.clone());
    let mut ws = connect(addr).await;
    wait_for_clients(&registry, 1).await;

    ws.send(Message::Text(r#"{"type":"subscribe","symbols":["AAPL"]}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "subscription_confirmed");

    broadcaster.broadcast(&quote("GOOGL", "141.80")).unwrap();
    assert_eq!(next_json(&mut ws).await["symbol"], "GOOGL");
}

#[tokio::test]
async fn test_malformed_control_frame_gets_error_and_keeps_connection() {
    let (addr, registry, _server) = start_server().await;
    let broadcaster = Broadcaster::new(registry.clone());
    let mut ws = connect(addr).await;
    wait_for_clients(&registry, 1).await;

    ws.send(Message::Text("definitely not json".into())).await.unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"].is_string());

    // Still registered and still served.
    assert_eq!(registry.len(), 1);
    broadcaster.broadcast(&quote("AAPL", "1.00")).unwrap();
    assert_eq!(next_json(&mut ws).await["symbol"], "AAPL");
}

// ===================================================================
// Keepalive
// ===================================================================

#[tokio::test]
async fn test_server_sends_keepalive_pings() {
    let registry = Arc::new(ConnectionRegistry::new());
    let server = RelayServer::bind("127.0.0.1:0", registry.clone())
        .await
        .unwrap()
        .with_session_config(SessionConfig {
            ping_interval: Duration::from_millis(50),
            ..SessionConfig::default()
        })
        .unwrap();
    let addr = server.local_addr().unwrap();
    let _server = server.spawn();

    let mut ws = connect(addr).await;
    let frame = tokio::time::timeout(WAIT, ws.next())
        .await
        .expect("ping within timeout")
        .expect("stream open")
        .expect("valid frame");
    assert!(matches!(frame, Message::Ping(_)), "{frame:?}");
}

#[tokio::test]
async fn test_zero_session_settings_are_rejected() {
    let registry = Arc::new(ConnectionRegistry::new());

    let server = RelayServer::bind("127.0.0.1:0", registry.clone()).await.unwrap();
    let err = server
        .with_session_config(SessionConfig {
            ping_interval: Duration::ZERO,
            ..SessionConfig::default()
        })
        .err()
        .expect("zero ping interval rejected");
    assert!(matches!(err, RelayError::Config(_)), "{err:?}");

    let server = RelayServer::bind("127.0.0.1:0", registry).await.unwrap();
    let err = server
        .with_session_config(SessionConfig {
            outbound_capacity: 0,
            ..SessionConfig::default()
        })
        .err()
        .expect("zero queue capacity rejected");
    assert!(matches!(err, RelayError::Config(_)), "{err:?}");
}

// ===================================================================
// Server lifetime
// ===================================================================

#[tokio::test]
async fn test_aborting_server_closes_open_sessions() {
    let (addr, registry, server) = start_server().await;
    let mut ws = connect(addr).await;
    wait_for_clients(&registry, 1).await;

    server.abort();
    wait_for_clients(&registry, 0).await;
    assert_stream_ends(&mut ws).await;
}

/// Helper: the viewer sees its stream end (close frame, EOF or reset)
/// without receiving any further quote.
async fn assert_stream_ends(ws: &mut Client) {
    tokio::time::timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Text(text))) => panic!("unexpected frame after close: {text}"),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await
    .expect("stream ends within timeout");
}
