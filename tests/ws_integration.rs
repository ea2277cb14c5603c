use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use orderly_api_client::auth::{Credentials, RequestSigner, TimestampProvider};
use orderly_api_client::error::OrderlyError;
use orderly_api_client::ws::{PrivateWsManager, PublicWsManager, WsConfig};

const TIMESTAMP: i64 = 1700000000000;

#[derive(Debug)]
enum ServerEvent {
    Connected {
        conn_id: usize,
        outbound: mpsc::UnboundedSender<Message>,
    },
    Frame {
        conn_id: usize,
        json: Value,
    },
    #[allow(dead_code)]
    Disconnected { conn_id: usize },
}

async fn spawn_ws_server() -> (SocketAddr, mpsc::UnboundedReceiver<ServerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut conn_id = 0usize;
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            conn_id = conn_id.saturating_add(1);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
                let _ = tx.send(ServerEvent::Connected {
                    conn_id,
                    outbound: outbound_tx,
                });

                loop {
                    tokio::select! {
                        queued = outbound_rx.recv() => {
                            // Tests drop the outbound handle to close the connection.
                            let Some(message) = queued else { break; };
                            if ws.send(message).await.is_err() {
                                break;
                            }
                        }
                        inbound = ws.next() => {
                            let Some(message) = inbound else { break; };
                            match message {
                                Ok(Message::Text(text)) => {
                                    let json = serde_json::from_str(&text).unwrap();
                                    let _ = tx.send(ServerEvent::Frame { conn_id, json });
                                }
                                Ok(Message::Close(_)) => break,
                                Err(_) => break,
                                _ => {}
                            }
                        }
                    }
                }
                let _ = tx.send(ServerEvent::Disconnected { conn_id });
            });
        }
    });

    (addr, rx)
}

async fn next_connection(
    rx: &mut mpsc::UnboundedReceiver<ServerEvent>,
) -> (usize, mpsc::UnboundedSender<Message>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(ServerEvent::Connected { conn_id, outbound }) => return (conn_id, outbound),
                Some(_) => {}
                None => panic!("server event stream ended"),
            }
        }
    })
    .await
    .expect("timed out waiting for server connection")
}

async fn next_frame(rx: &mut mpsc::UnboundedReceiver<ServerEvent>, conn: usize) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(ServerEvent::Frame { conn_id, json }) if conn_id == conn => return json,
                Some(_) => {}
                None => panic!("server event stream ended"),
            }
        }
    })
    .await
    .expect("timed out waiting for client frame")
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

fn push(outbound: &mpsc::UnboundedSender<Message>, json: Value) {
    outbound.send(Message::text(json.to_string())).unwrap();
}

fn public_manager(addr: SocketAddr) -> PublicWsManager {
    PublicWsManager::builder()
        .endpoint(format!("ws://{addr}/"))
        .account_id("test-account")
        .build()
        .unwrap()
}

fn test_secret() -> String {
    bs58::encode([9u8; 32]).into_string()
}

struct PinnedTimestamp(i64);

impl TimestampProvider for PinnedTimestamp {
    fn timestamp_ms(&self) -> i64 {
        self.0
    }
}

fn private_manager(addr: SocketAddr) -> PrivateWsManager {
    PrivateWsManager::builder()
        .endpoint(format!("ws://{addr}/"))
        .credentials(Credentials::new("0xtest-account", "test-key", test_secret()))
        .timestamp_provider(Arc::new(PinnedTimestamp(TIMESTAMP)))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscribe_before_start_replays_on_connect() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);

    ws.subscribe("bbos");
    ws.start();

    let (conn, outbound) = next_connection(&mut rx).await;
    let subscribe = next_frame(&mut rx, conn).await;
    assert_eq!(subscribe["event"], "subscribe");
    assert_eq!(subscribe["topic"], "bbos");
    assert_eq!(subscribe["id"], "WS_PUBLIC");

    push(
        &outbound,
        json!({
            "topic": "bbos",
            "ts": 1700000000000i64,
            "data": { "PERP_ETH_USDC": { "bid": "1900.0", "ask": "1900.5" } }
        }),
    );

    let update = ws.recv("bbos").await.unwrap();
    assert_eq!(update["PERP_ETH_USDC"]["bid"], "1900.0");
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_facade_subscribe_sends_topic_request() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.start();

    let (conn, _outbound) = next_connection(&mut rx).await;
    wait_until(|| ws.is_connected()).await;

    ws.subscribe_trade("PERP_ETH_USDC").unwrap();
    let frame = next_frame(&mut rx, conn).await;
    assert_eq!(frame["event"], "subscribe");
    assert_eq!(frame["topic"], "PERP_ETH_USDC@trade");
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_ping_answered_with_pong() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.subscribe("bbos");
    ws.start();

    let (conn, outbound) = next_connection(&mut rx).await;
    let _subscribe = next_frame(&mut rx, conn).await;

    push(&outbound, json!({ "event": "ping", "ts": 1700000000000i64 }));
    let pong = next_frame(&mut rx, conn).await;
    assert_eq!(pong, json!({ "event": "pong" }));

    // The heartbeat never lands in a topic queue.
    push(&outbound, json!({ "topic": "bbos", "ts": 1, "data": { "seq": 1 } }));
    let update = ws.recv("bbos").await.unwrap();
    assert_eq!(update["seq"], 1);
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reconnect_replays_subscriptions() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.subscribe("bbos");
    ws.start();

    let (first, first_outbound) = next_connection(&mut rx).await;
    let first_subscribe = next_frame(&mut rx, first).await;
    assert_eq!(first_subscribe["topic"], "bbos");

    // Server drops the connection; the manager reconnects and resubscribes.
    drop(first_outbound);

    let (second, second_outbound) = next_connection(&mut rx).await;
    assert_ne!(first, second);
    let second_subscribe = next_frame(&mut rx, second).await;
    assert_eq!(second_subscribe["event"], "subscribe");
    assert_eq!(second_subscribe["topic"], "bbos");

    push(&second_outbound, json!({ "topic": "bbos", "ts": 2, "data": { "seq": 2 } }));
    let update = ws.recv("bbos").await.unwrap();
    assert_eq!(update["seq"], 2);
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_private_manager_authenticates_before_each_subscribe() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = private_manager(addr);
    ws.subscribe("position");
    ws.subscribe("balance");
    ws.start();

    let (conn, _outbound) = next_connection(&mut rx).await;

    let expected_sign = RequestSigner::from_base58_secret(&test_secret())
        .unwrap()
        .sign_base64(TIMESTAMP.to_string().as_bytes());

    let mut topics = Vec::new();
    for _ in 0..2 {
        let auth = next_frame(&mut rx, conn).await;
        assert_eq!(auth["event"], "auth");
        assert_eq!(auth["params"]["orderly_key"], "ed25519:test-key");
        assert_eq!(auth["params"]["timestamp"], "1700000000000");
        assert_eq!(auth["params"]["sign"], expected_sign.as_str());

        let subscribe = next_frame(&mut rx, conn).await;
        assert_eq!(subscribe["event"], "subscribe");
        topics.push(subscribe["topic"].as_str().unwrap().to_string());
    }
    topics.sort();
    assert_eq!(topics, vec!["balance".to_string(), "position".to_string()]);
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_orderbook_request_routed_to_symbol_topic() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.start();

    let (conn, outbound) = next_connection(&mut rx).await;
    wait_until(|| ws.is_connected()).await;

    ws.request_orderbook("PERP_ETH_USDC").unwrap();
    let request = next_frame(&mut rx, conn).await;
    assert_eq!(request["event"], "request");
    assert_eq!(request["params"]["type"], "orderbook");
    assert_eq!(request["params"]["symbol"], "PERP_ETH_USDC");

    push(
        &outbound,
        json!({
            "id": "WS_PUBLIC",
            "event": "request",
            "success": true,
            "ts": 1700000000777i64,
            "data": {
                "symbol": "PERP_ETH_USDC",
                "asks": [["1900.5", "10"]],
                "bids": [["1900.0", "5"]]
            }
        }),
    );

    let snapshot = ws.recv("PERP_ETH_USDC@orderbook").await.unwrap();
    assert_eq!(snapshot["asks"][0][0], "1900.5");
    assert_eq!(snapshot["ts"], 1700000000777i64);
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unsubscribe_drops_topic_queue() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.subscribe("bbos");
    ws.subscribe("24h_tickers");
    ws.start();

    let (conn, outbound) = next_connection(&mut rx).await;
    let _first = next_frame(&mut rx, conn).await;
    let _second = next_frame(&mut rx, conn).await;

    ws.unsubscribe("bbos").unwrap();
    let frame = next_frame(&mut rx, conn).await;
    assert_eq!(frame["event"], "unsubscribe");
    assert_eq!(frame["topic"], "bbos");

    let error = ws.recv("bbos").await.unwrap_err();
    assert!(matches!(error, OrderlyError::UnknownTopic { .. }));

    push(
        &outbound,
        json!({ "topic": "24h_tickers", "ts": 3, "data": [{ "symbol": "PERP_ETH_USDC" }] }),
    );
    let tickers = ws.recv("24h_tickers").await.unwrap();
    assert_eq!(tickers[0]["symbol"], "PERP_ETH_USDC");
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_unblocks_pending_recv() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.subscribe("bbos");
    ws.start();

    let (_conn, _outbound) = next_connection(&mut rx).await;

    let waiter = {
        let ws = ws.clone();
        tokio::spawn(async move { ws.recv("bbos").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    ws.stop().await;

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(OrderlyError::Stopped)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_recv_waits_through_quiet_intervals() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.subscribe("bbos");
    ws.start();

    let (conn, outbound) = next_connection(&mut rx).await;
    let _subscribe = next_frame(&mut rx, conn).await;

    let pusher = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        push(&outbound, json!({ "topic": "bbos", "ts": 4, "data": { "seq": 4 } }));
        outbound
    });

    // Shorter than the push delay, so the wait loops at least twice.
    let update = ws
        .recv_with_timeout("bbos", Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(update["seq"], 4);

    let _outbound = pusher.await.unwrap();
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_ack_restarts_session() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.subscribe("bbos");
    ws.start();

    let (first, first_outbound) = next_connection(&mut rx).await;
    let _subscribe = next_frame(&mut rx, first).await;

    push(
        &first_outbound,
        json!({
            "id": "WS_PUBLIC",
            "event": "subscribe",
            "success": false,
            "errorMsg": "subscription rejected"
        }),
    );

    // The failed ack tears the session down; a fresh connection resubscribes.
    let (second, second_outbound) = next_connection(&mut rx).await;
    assert_ne!(first, second);
    let resubscribe = next_frame(&mut rx, second).await;
    assert_eq!(resubscribe["topic"], "bbos");

    push(&second_outbound, json!({ "topic": "bbos", "ts": 5, "data": { "seq": 5 } }));
    let update = ws.recv("bbos").await.unwrap();
    assert_eq!(update["seq"], 5);
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_frame_does_not_kill_session() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.subscribe("bbos");
    ws.start();

    let (conn, outbound) = next_connection(&mut rx).await;
    let _subscribe = next_frame(&mut rx, conn).await;

    outbound.send(Message::text("{not json".to_string())).unwrap();
    push(&outbound, json!({ "topic": "bbos", "ts": 6, "data": { "seq": 6 } }));

    let update = ws.recv("bbos").await.unwrap();
    assert_eq!(update["seq"], 6);
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_idle_read_timeout_restarts_connection() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = PublicWsManager::builder()
        .endpoint(format!("ws://{addr}/"))
        .account_id("test-account")
        .config(
            WsConfig::builder()
                .read_timeout(Duration::from_millis(100))
                .build(),
        )
        .build()
        .unwrap();
    ws.subscribe("bbos");
    ws.start();

    let (first, _first_outbound) = next_connection(&mut rx).await;
    let first_subscribe = next_frame(&mut rx, first).await;
    assert_eq!(first_subscribe["topic"], "bbos");

    // The server stays silent past the idle timeout; the manager restarts
    // the connection and resubscribes.
    let (second, second_outbound) = next_connection(&mut rx).await;
    assert_ne!(first, second);
    let resubscribe = next_frame(&mut rx, second).await;
    assert_eq!(resubscribe["event"], "subscribe");
    assert_eq!(resubscribe["topic"], "bbos");

    push(&second_outbound, json!({ "topic": "bbos", "ts": 9, "data": { "seq": 9 } }));
    let update = ws.recv("bbos").await.unwrap();
    assert_eq!(update["seq"], 9);
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exhausted_reconnect_attempts_stop_manager() {
    // Bind then drop to get a local port nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ws = PublicWsManager::builder()
        .endpoint(format!("ws://{addr}/"))
        .account_id("test-account")
        .config(WsConfig::builder().max_reconnect_attempts(2).build())
        .build()
        .unwrap();
    ws.subscribe("bbos");
    ws.start();

    // Once the attempts run out the manager flips its shutdown flag, so the
    // blocked recv unblocks with Stopped instead of waiting forever.
    let result = tokio::time::timeout(Duration::from_secs(5), ws.recv("bbos"))
        .await
        .expect("recv should unblock once reconnect attempts run out");
    assert!(matches!(result, Err(OrderlyError::Stopped)));
    ws.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unregistered_topic_data_dropped() {
    let (addr, mut rx) = spawn_ws_server().await;
    let ws = public_manager(addr);
    ws.subscribe("bbos");
    ws.start();

    let (conn, outbound) = next_connection(&mut rx).await;
    let _subscribe = next_frame(&mut rx, conn).await;

    push(&outbound, json!({ "topic": "mystery", "ts": 7, "data": { "seq": 0 } }));
    push(&outbound, json!({ "topic": "bbos", "ts": 8, "data": { "seq": 8 } }));

    let update = ws.recv("bbos").await.unwrap();
    assert_eq!(update["seq"], 8);
    ws.stop().await;
}
