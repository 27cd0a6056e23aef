//! End-to-end test of the server: a browser-style websocket client receives
//! the change caused by an HTTP advance request.

use futures_util::{SinkExt, StreamExt};
use purplefox::api::{build_router, AppState};
use purplefox::backend::{MemoryStore, TableStore};
use purplefox::config::Config;
use purplefox::status::{Status, TableStatus};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

async fn next_json<S>(ws: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_advance_is_pushed_to_subscribers() {
    let store = Arc::new(MemoryStore::with_rows([TableStatus::new(
        "abc123",
        5,
        Status::Covered,
    )]));
    let state = AppState::new(store.clone(), &Config::default());
    Arc::clone(&state.ws_hub).forward_changes(store.subscribe());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    let (mut ws, _) = connect_async(format!("ws://{}/api/v1/ws", addr))
        .await
        .unwrap();

    let connected = next_json(&mut ws).await;
    assert_eq!(connected["type"], "connected");

    ws.send(Message::Text(
        r#"{"type":"subscribe","topics":["tournaments.abc123"]}"#.to_string().into(),
    ))
    .await
    .unwrap();
    let subscribed = next_json(&mut ws).await;
    assert_eq!(subscribed["type"], "subscribed");

    let snapshot = next_json(&mut ws).await;
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["tournament_id"], "abc123");
    assert_eq!(snapshot["tables"][0]["status"], "covered");

    let response = reqwest::Client::new()
        .post(format!(
            "http://{}/api/v1/tournaments/abc123/tables/5/advance",
            addr
        ))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let update = next_json(&mut ws).await;
    assert_eq!(update["type"], "table_status");
    assert_eq!(update["tournament_id"], "abc123");
    assert_eq!(update["table_number"], 5);
    assert_eq!(update["status"], "done");
    assert_eq!(update["change"], "update");
}

#[tokio::test]
async fn test_other_tournaments_are_not_pushed() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), &Config::default());
    let hub = Arc::clone(&state.ws_hub);
    Arc::clone(&hub).forward_changes(store.subscribe());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    let (mut ws, _) = connect_async(format!("ws://{}/api/v1/ws", addr))
        .await
        .unwrap();
    next_json(&mut ws).await;
    ws.send(Message::Text(
        r#"{"type":"subscribe","topics":["tournaments.mine"]}"#.to_string().into(),
    ))
    .await
    .unwrap();
    next_json(&mut ws).await;
    let snapshot = next_json(&mut ws).await;
    assert_eq!(snapshot["tables"].as_array().map(Vec::len), Some(0));

    store.set_status("theirs", 1, Status::Playing).await.unwrap();
    store.set_status("mine", 2, Status::Playing).await.unwrap();

    let update = next_json(&mut ws).await;
    assert_eq!(update["tournament_id"], "mine");
    assert_eq!(hub.subscription_count("tournaments.mine").await, 1);
}
