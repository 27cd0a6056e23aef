//! Realtime Subscription
//!
//! Listens for row changes on the backend's realtime websocket (Phoenix
//! channel protocol) and publishes them as [`StatusChange`]s.
//!
//! Changes are forwarded exactly as received; there is no ordering
//! reconciliation against local writes and no de-duplication.

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{BackendError, BackendResult, ChangeKind, StatusChange};
use crate::config::{BackendCredentials, RealtimeConfig};
use crate::status::TableStatus;

/// Longest wait between reconnect attempts
const MAX_BACKOFF_SECS: u64 = 30;

/// Websocket endpoint for an HTTP(S) backend URL
pub fn websocket_url(http_url: &str, key: &str) -> String {
    let base = http_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };

    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        ws_base,
        urlencoding::encode(key)
    )
}

/// Phoenix channel frame
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join_ref: Option<String>,
}

impl PhoenixMessage {
    fn heartbeat(reference: u64) -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
            join_ref: None,
        }
    }
}

/// Subscription to row changes of one relation
pub struct RealtimeListener {
    url: String,
    topic: String,
    join_payload: Value,
    config: RealtimeConfig,
    changes: broadcast::Sender<StatusChange>,
}

impl RealtimeListener {
    pub fn new(
        credentials: &BackendCredentials,
        schema: &str,
        table: &str,
        config: RealtimeConfig,
        changes: broadcast::Sender<StatusChange>,
    ) -> Self {
        let join_payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": schema, "table": table }
                ]
            },
            "access_token": credentials.key,
        });

        Self {
            url: websocket_url(&credentials.url, &credentials.key),
            topic: format!("realtime:{}:{}", schema, table),
            join_payload,
            config,
            changes,
        }
    }

    /// Channel topic joined on connect
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run the listener on the tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Connect, listen, and reconnect with exponential backoff until the
    /// attempt budget is spent. A session the backend accepted restores the
    /// full budget, however it ended.
    pub async fn run(self) {
        let mut attempts: u32 = 0;

        loop {
            let mut joined = false;
            match self.listen(&mut joined).await {
                Ok(()) => {
                    tracing::info!(topic = %self.topic, "Realtime connection closed by backend");
                }
                Err(e) => {
                    tracing::warn!(
                        topic = %self.topic,
                        joined,
                        error = %e,
                        "Realtime connection failed"
                    );
                }
            }
            if joined {
                attempts = 0;
            }

            if attempts >= self.config.max_reconnect_attempts {
                tracing::error!(
                    topic = %self.topic,
                    attempts,
                    "Max realtime reconnect attempts reached, giving up"
                );
                return;
            }

            let delay = backoff_delay(attempts);
            attempts += 1;
            tracing::info!(
                attempt = attempts,
                delay_secs = delay.as_secs(),
                "Reconnecting to realtime"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One connection: join the channel, heartbeat, forward changes.
    /// Sets `joined` once the backend acknowledges the join.
    async fn listen(&self, joined: &mut bool) -> BackendResult<()> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| BackendError::Realtime(format!("connect failed: {}", e)))?;
        let (mut write, mut read) = stream.split();

        let mut next_ref: u64 = 1;
        let join = PhoenixMessage {
            topic: self.topic.clone(),
            event: "phx_join".to_string(),
            payload: self.join_payload.clone(),
            reference: Some(next_ref.to_string()),
            join_ref: Some(next_ref.to_string()),
        };
        send_frame(&mut write, &join).await?;

        let period = Duration::from_secs(self.config.heartbeat_interval_secs.max(1));
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    next_ref += 1;
                    send_frame(&mut write, &PhoenixMessage::heartbeat(next_ref)).await?;
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if self.handle_text(text.as_str())? && !*joined {
                            *joined = true;
                            tracing::info!(topic = %self.topic, "Joined realtime channel");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(BackendError::Realtime(e.to_string())),
                }
            }
        }
    }

    /// Handle one text frame; `Ok(true)` when it acknowledges the channel join
    fn handle_text(&self, text: &str) -> BackendResult<bool> {
        let message: PhoenixMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed realtime frame");
                return Ok(false);
            }
        };

        match message.event.as_str() {
            "postgres_changes" => match parse_change(&message.payload) {
                Some(change) => {
                    tracing::debug!(
                        kind = ?change.kind,
                        tournament_id = %change.record.tournament_id,
                        table_number = change.record.table_number,
                        "Realtime change"
                    );
                    let _ = self.changes.send(change);
                }
                None => {
                    tracing::debug!("Ignoring realtime change without a table status record")
                }
            },
            "phx_reply" if message.topic == self.topic => {
                match message.payload.get("status").and_then(Value::as_str) {
                    Some("ok") => return Ok(true),
                    Some("error") => {
                        return Err(BackendError::Realtime(format!(
                            "join rejected: {}",
                            message.payload.get("response").cloned().unwrap_or(Value::Null)
                        )));
                    }
                    _ => {}
                }
            }
            "phx_error" | "phx_close" if message.topic == self.topic => {
                return Err(BackendError::Realtime(format!("channel {}", message.event)));
            }
            _ => {}
        }

        Ok(false)
    }
}

async fn send_frame<S>(write: &mut S, message: &PhoenixMessage) -> BackendResult<()>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text =
        serde_json::to_string(message).map_err(|e| BackendError::Realtime(e.to_string()))?;
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| BackendError::Realtime(e.to_string()))
}

/// Delay before reconnect attempt `attempt` (0-based): 1s, 2s, 4s … 30s
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}

/// Translate a `postgres_changes` payload into a change notification
fn parse_change(payload: &Value) -> Option<StatusChange> {
    let data = payload.get("data")?;

    let kind = match data.get("type")?.as_str()? {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        _ => return None,
    };

    let record = match kind {
        ChangeKind::Delete => data.get("old_record")?,
        _ => data.get("record")?,
    };
    let record: TableStatus = serde_json::from_value(record.clone()).ok()?;

    let commit_timestamp = data
        .get("commit_timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(StatusChange {
        kind,
        record,
        commit_timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn test_websocket_url() {
        assert_eq!(
            websocket_url("https://demo.supabase.co/", "a+b"),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=a%2Bb&vsn=1.0.0"
        );
        assert!(
            websocket_url("http://127.0.0.1:54321", "k").starts_with("ws://127.0.0.1:54321/")
        );
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(5), Duration::from_secs(30));
        assert_eq!(backoff_delay(64), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_update() {
        let payload = json!({
            "data": {
                "type": "UPDATE",
                "schema": "public",
                "table": "table_status",
                "commit_timestamp": "2026-03-14T18:30:00.123Z",
                "record": {"tableNumber": 5, "tournamentId": "t1", "status": "done"},
                "old_record": {"tableNumber": 5, "tournamentId": "t1"}
            },
            "ids": [1]
        });

        let change = parse_change(&payload).unwrap();
        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(change.record, TableStatus::new("t1", 5, Status::Done));
        assert!(change.commit_timestamp.is_some());
    }

    #[test]
    fn test_parse_delete_uses_old_record() {
        let payload = json!({
            "data": {
                "type": "DELETE",
                "old_record": {"tableNumber": 2, "tournamentId": "t9", "status": "playing"}
            }
        });

        let change = parse_change(&payload).unwrap();
        assert_eq!(change.kind, ChangeKind::Delete);
        assert_eq!(change.record.tournament_id, "t9");
        assert!(change.commit_timestamp.is_none());
    }

    #[test]
    fn test_parse_rejects_foreign_rows() {
        let payload = json!({
            "data": {"type": "INSERT", "record": {"id": 1, "name": "other"}}
        });
        assert!(parse_change(&payload).is_none());
        assert!(parse_change(&json!({})).is_none());
    }

    #[test]
    fn test_join_reply_error_fails_listener() {
        let (tx, _rx) = broadcast::channel(4);
        let credentials = BackendCredentials {
            url: "http://localhost:54321".to_string(),
            key: "k".to_string(),
        };
        let listener = RealtimeListener::new(
            &credentials,
            "public",
            "table_status",
            RealtimeConfig::default(),
            tx,
        );
        assert_eq!(listener.topic(), "realtime:public:table_status");

        let reply = r#"{"topic":"realtime:public:table_status","event":"phx_reply","payload":{"status":"error","response":{"reason":"denied"}},"ref":"1"}"#;
        assert!(listener.handle_text(reply).is_err());

        let ok = r#"{"topic":"realtime:public:table_status","event":"phx_reply","payload":{"status":"ok","response":{}},"ref":"1"}"#;
        assert!(listener.handle_text(ok).unwrap());
        assert!(!listener.handle_text("not json").unwrap());

        // Heartbeat replies on the phoenix topic are not a join
        let heartbeat = r#"{"topic":"phoenix","event":"phx_reply","payload":{"status":"ok","response":{}},"ref":"2"}"#;
        assert!(!listener.handle_text(heartbeat).unwrap());
    }
}
