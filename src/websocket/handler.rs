//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::ConnectionHub;
use super::messages::{topic_tournament, ClientMessage, ServerMessage};
use crate::api::AppState;
use crate::backend::TableStore;

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.ws_hub);
    let store = Arc::clone(&state.store);
    ws.on_upgrade(move |socket| handle_socket(socket, hub, store))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>, store: Arc<dyn TableStore>) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Register with hub
    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected WebSocket connection");
            if let Some(frame) = encode(&ServerMessage::Error {
                message: e.to_string(),
            }) {
                let _ = sender.send(frame).await;
            }
            return;
        }
    };

    // Send connected message with connection ID
    let connected_msg = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let delivered = match encode(&connected_msg) {
        Some(frame) => sender.send(frame).await.is_ok(),
        None => false,
    };
    if !delivered {
        tracing::error!(connection_id = %connection_id, "Failed to send connected message");
        hub.unregister(&connection_id).await;
        return;
    }

    let conn_id_for_send = connection_id.clone();

    // Task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(frame) = encode(&msg) else {
                continue;
            };
            if sender.send(frame).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let hub_for_recv = Arc::clone(&hub);
    let conn_id_for_recv = connection_id.clone();

    // Task to receive messages from WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    let keep_open =
                        handle_ws_message(&hub_for_recv, store.as_ref(), &conn_id_for_recv, msg)
                            .await;
                    if !keep_open {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // Cleanup: unregister from hub
    hub.unregister(&connection_id).await;
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(
    hub: &Arc<ConnectionHub>,
    store: &dyn TableStore,
    connection_id: &str,
    message: Message,
) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(hub, store, connection_id, client_msg).await;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        text = %text,
                        "Invalid client message"
                    );
                    // Send error but keep connection open
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = hub.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            // We don't support binary messages
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = hub.send_to(connection_id, error_msg).await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Send the current rows of a tournament to one connection
async fn send_snapshot(
    hub: &ConnectionHub,
    store: &dyn TableStore,
    connection_id: &str,
    tournament_id: String,
) {
    let message = match store.tables(&tournament_id).await {
        Ok(tables) => ServerMessage::Snapshot {
            tournament_id,
            tables,
        },
        Err(e) => {
            tracing::warn!(
                connection_id = %connection_id,
                tournament_id = %tournament_id,
                error = %e,
                "Snapshot failed"
            );
            ServerMessage::Error {
                message: format!("Could not load tournament {}: {}", tournament_id, e),
            }
        }
    };
    let _ = hub.send_to(connection_id, message).await;
}

/// Serialize a server message into a text frame
fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

/// Handle a parsed client message
async fn handle_client_message(
    hub: &Arc<ConnectionHub>,
    store: &dyn TableStore,
    connection_id: &str,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Subscribe { topics } => {
            match hub.subscribe(connection_id, topics).await {
                Ok(subscribed) => {
                    let tournaments: Vec<String> = subscribed
                        .iter()
                        .filter_map(|topic| topic_tournament(topic).map(str::to_string))
                        .collect();
                    let response = ServerMessage::Subscribed { topics: subscribed };
                    let _ = hub.send_to(connection_id, response).await;

                    for tournament_id in tournaments {
                        send_snapshot(hub, store, connection_id, tournament_id).await;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %connection_id,
                        error = %e,
                        "Subscribe error"
                    );
                    let error_msg = ServerMessage::Error {
                        message: e.to_string(),
                    };
                    let _ = hub.send_to(connection_id, error_msg).await;
                }
            }
        }
        ClientMessage::Unsubscribe { topics } => {
            match hub.unsubscribe(connection_id, topics).await {
                Ok(unsubscribed) => {
                    let response = ServerMessage::Unsubscribed {
                        topics: unsubscribed,
                    };
                    let _ = hub.send_to(connection_id, response).await;
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %connection_id,
                        error = %e,
                        "Unsubscribe error"
                    );
                    let error_msg = ServerMessage::Error {
                        message: e.to_string(),
                    };
                    let _ = hub.send_to(connection_id, error_msg).await;
                }
            }
        }
        ClientMessage::Ping => {
            let response = ServerMessage::Pong;
            let _ = hub.send_to(connection_id, response).await;
        }
    }
}
