//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! browser views and the purplefox server.

use serde::{Deserialize, Serialize};

use crate::backend::{ChangeKind, StatusChange};
use crate::status::{Status, TableNumber, TableStatus};

/// Topic prefix for tournament updates
pub const TOURNAMENT_TOPIC_PREFIX: &str = "tournaments.";

/// Topic receiving every tournament's updates
pub const ALL_TOURNAMENTS_TOPIC: &str = "tournaments.*";

/// Topic for one tournament's updates
pub fn tournament_topic(tournament_id: &str) -> String {
    format!("{}{}", TOURNAMENT_TOPIC_PREFIX, tournament_id)
}

/// Tournament id of a single-tournament topic (`None` for the wildcard)
pub fn topic_tournament(topic: &str) -> Option<&str> {
    topic
        .strip_prefix(TOURNAMENT_TOPIC_PREFIX)
        .filter(|id| !id.is_empty() && *id != "*")
}

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// Topics such as "tournaments.abc123" or "tournaments.*"
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe { topics: Vec<String> },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A table status row changed
    TableStatus {
        tournament_id: String,
        table_number: TableNumber,
        status: Status,
        change: ChangeKind,
    },
    /// Current rows of a tournament, sent after subscribing to it
    Snapshot {
        tournament_id: String,
        tables: Vec<TableStatus>,
    },
    /// Subscription confirmed
    Subscribed { topics: Vec<String> },
    /// Unsubscription confirmed
    Unsubscribed { topics: Vec<String> },
    /// Pong response to ping
    Pong,
    /// Error message
    Error { message: String },
    /// Connection established
    Connected { connection_id: String },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to (e.g., "tournaments.abc123")
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl From<StatusChange> for WsEvent {
    fn from(change: StatusChange) -> Self {
        let record = change.record;
        Self {
            topic: tournament_topic(&record.tournament_id),
            message: ServerMessage::TableStatus {
                tournament_id: record.tournament_id,
                table_number: record.table_number,
                status: record.status,
                change: change.kind,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_tournament() {
        assert_eq!(topic_tournament("tournaments.abc123"), Some("abc123"));
        assert_eq!(topic_tournament(&tournament_topic("x")), Some("x"));
        assert_eq!(topic_tournament(ALL_TOURNAMENTS_TOPIC), None);
        assert_eq!(topic_tournament("tables.1"), None);
    }

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "topics": ["tournaments.abc123"]}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { topics } => assert_eq!(topics, vec!["tournaments.abc123"]),
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_deserialize_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_event_from_change() {
        let change = StatusChange::new(
            ChangeKind::Update,
            TableStatus::new("abc123", 9, Status::Covered),
        );
        let event = WsEvent::from(change);
        assert_eq!(event.topic, "tournaments.abc123");

        let json = serde_json::to_string(&event.message).unwrap();
        assert!(json.contains("\"type\":\"table_status\""));
        assert!(json.contains("\"table_number\":9"));
        assert!(json.contains("\"status\":\"covered\""));
        assert!(json.contains("\"change\":\"update\""));
    }
}
