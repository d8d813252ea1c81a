//! End-to-end WebSocket tests against a real listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use timetable_server::demo::DemoBridge;
use timetable_server::web::Web;
use timetable_server::Cli;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve on an OS-assigned port with a fast sync tick.
async fn start_server(bridge: Arc<DemoBridge>) -> SocketAddr {
    let args = Cli::parse_from(["timetable-server", "--sync-interval-ms", "100"]);
    let web = Web::new(bridge, &args);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = web.router().into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn recv_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Read messages until one of the given type arrives; sync pushes in
/// between are expected and skipped.
async fn wait_for(ws: &mut WsClient, message_type: &str) -> serde_json::Value {
    for _ in 0..50 {
        let value = recv_json(ws).await;
        if value["MessageType"] == message_type {
            return value;
        }
    }
    panic!("no {} message arrived", message_type);
}

#[tokio::test]
async fn test_initial_push_is_full_timetable() {
    let addr = start_server(Arc::new(DemoBridge::new())).await;
    let mut ws = connect(addr).await;

    let first = recv_json(&mut ws).await;
    assert_eq!(first["MessageType"], "Timetable");
    assert!(first.get("TrainId").is_none());
    assert!(first.get("WorkId").is_none());
    assert!(first.get("WorkGroupId").is_none());
    assert_eq!(first["Data"][0]["Name"], "Demo Line");
}

#[tokio::test]
async fn test_periodic_sync_push() {
    let addr = start_server(Arc::new(DemoBridge::new())).await;
    let mut ws = connect(addr).await;

    let sync = wait_for(&mut ws, "SyncedData").await;
    assert!(sync["Location_m"].is_number());
    assert!(sync["Time_ms"].is_number());
    assert_eq!(sync["CanStart"], true);

    // And it keeps coming
    wait_for(&mut ws, "SyncedData").await;
}

#[tokio::test]
async fn test_scope_update_is_acknowledged_with_scoped_data() {
    let addr = start_server(Arc::new(DemoBridge::new())).await;
    let mut ws = connect(addr).await;
    recv_json(&mut ws).await; // initial snapshot

    ws.send(Message::Text("{\"trainId\":\"demo-t2\"}".to_string()))
        .await
        .unwrap();

    let ack = wait_for(&mut ws, "Timetable").await;
    assert_eq!(ack["TrainId"], "demo-t2");
    let trains = ack["Data"][0]["Works"][0]["Trains"].as_array().unwrap();
    assert_eq!(trains.len(), 1);
    assert_eq!(trains[0]["Id"], "demo-t2");
}

#[tokio::test]
async fn test_unknown_scope_id_gets_no_ack() {
    let addr = start_server(Arc::new(DemoBridge::new())).await;
    let mut ws = connect(addr).await;
    recv_json(&mut ws).await; // initial snapshot

    ws.send(Message::Text("{\"trainId\":\"no-such-train\"}".to_string()))
        .await
        .unwrap();

    // Only sync pushes from here on; a Timetable ack would be a bug
    for _ in 0..5 {
        let value = recv_json(&mut ws).await;
        assert_eq!(value["MessageType"], "SyncedData");
    }
}

#[tokio::test]
async fn test_new_scenario_pushes_fresh_snapshot() {
    let bridge = Arc::new(DemoBridge::new());
    bridge.set_loaded(false);
    let addr = start_server(bridge.clone()).await;
    let mut ws = connect(addr).await;

    // While nothing is loaded the sync push is the all-empty form
    let sync = wait_for(&mut ws, "SyncedData").await;
    assert!(sync.get("Location_m").is_none());
    assert_eq!(sync["Time_ms"], 0);
    assert_eq!(sync["CanStart"], false);

    bridge.set_loaded(true);
    let push = wait_for(&mut ws, "Timetable").await;
    assert_eq!(push["Data"][0]["Name"], "Demo Line");
}

#[tokio::test]
async fn test_train_change_reaches_clients_with_their_own_scope() {
    let bridge = Arc::new(DemoBridge::new());
    let addr = start_server(bridge.clone()).await;

    let mut scoped = connect(addr).await;
    let mut unscoped = connect(addr).await;
    recv_json(&mut scoped).await;
    recv_json(&mut unscoped).await;

    scoped
        .send(Message::Text("{\"trainId\":\"demo-t1\"}".to_string()))
        .await
        .unwrap();
    wait_for(&mut scoped, "Timetable").await; // the ack

    bridge.switch_train();

    let update = wait_for(&mut scoped, "Timetable").await;
    assert_eq!(update["TrainId"], "demo-t1");

    let update = wait_for(&mut unscoped, "Timetable").await;
    assert!(update.get("TrainId").is_none());
    let trains = update["Data"][0]["Works"][0]["Trains"].as_array().unwrap();
    assert_eq!(trains.len(), 2);
}
