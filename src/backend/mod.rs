//! Data Access
//!
//! Typed access to the table status rows held by the hosted backend.
//!
//! ## Architecture
//!
//! - **TableStore**: the operations views rely on (read, upsert, advance,
//!   subscribe)
//! - **BackendClient**: hosted implementation over the backend's REST API
//! - **RealtimeListener**: feeds row-change notifications from the backend's
//!   realtime websocket into the client's broadcast channel
//! - **MemoryStore**: in-process implementation for tests and offline runs
//!
//! The backend is the single source of truth. Nothing here caches rows, locks
//! them, or orders concurrent writes: the last write from any client wins.

mod client;
mod memory;
mod realtime;

pub use client::BackendClient;
pub use memory::MemoryStore;
pub use realtime::{websocket_url, RealtimeListener};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::ConfigError;
use crate::status::{Status, TableNumber, TableStatus};

/// Capacity of the change notification channel
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Kind of row change reported by a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// A local write whose insert/update outcome is not reported by the backend
    Upsert,
}

/// A row-change notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub kind: ChangeKind,
    pub record: TableStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_timestamp: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn new(kind: ChangeKind, record: TableStatus) -> Self {
        Self {
            kind,
            record,
            commit_timestamp: None,
        }
    }
}

/// Operations on table status rows
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Rows of one tournament, ordered by table number
    async fn tables(&self, tournament_id: &str) -> BackendResult<Vec<TableStatus>>;

    /// One row, if it exists
    async fn table(
        &self,
        tournament_id: &str,
        table_number: TableNumber,
    ) -> BackendResult<Option<TableStatus>>;

    /// Distinct tournament ids, sorted
    async fn tournaments(&self) -> BackendResult<Vec<String>>;

    /// Insert or update the row keyed by `(tournamentId, tableNumber)`.
    ///
    /// A missing pair is created with the given status; an existing pair only
    /// has its status overwritten. Returns the stored row.
    async fn upsert(&self, row: &TableStatus) -> BackendResult<TableStatus>;

    /// Receiver of row-change notifications
    fn subscribe(&self) -> broadcast::Receiver<StatusChange>;

    /// Check the backend answers
    async fn health_check(&self) -> BackendResult<()>;

    /// Existing row, or a new one created as `unknown`
    async fn observe(
        &self,
        tournament_id: &str,
        table_number: TableNumber,
    ) -> BackendResult<TableStatus> {
        match self.table(tournament_id, table_number).await? {
            Some(row) => Ok(row),
            None => {
                tracing::debug!(tournament_id, table_number, "Creating observed table");
                self.upsert(&TableStatus::unknown(tournament_id, table_number))
                    .await
            }
        }
    }

    /// Overwrite a table's status
    async fn set_status(
        &self,
        tournament_id: &str,
        table_number: TableNumber,
        status: Status,
    ) -> BackendResult<TableStatus> {
        self.upsert(&TableStatus::new(tournament_id, table_number, status))
            .await
    }

    /// Move a table one step along the status cycle and persist it.
    ///
    /// A table that does not exist yet counts as `unknown`.
    async fn advance(
        &self,
        tournament_id: &str,
        table_number: TableNumber,
    ) -> BackendResult<TableStatus> {
        let current = self
            .table(tournament_id, table_number)
            .await?
            .map(|row| row.status)
            .unwrap_or_default();
        let next = current.next();

        tracing::debug!(
            tournament_id,
            table_number,
            from = %current,
            to = %next,
            "Advancing table status"
        );

        self.upsert(&TableStatus::new(tournament_id, table_number, next))
            .await
    }
}

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid backend response: {0}")]
    Decode(String),

    #[error("Realtime error: {0}")]
    Realtime(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
