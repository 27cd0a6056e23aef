//! In-process table store used by tests and offline runs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, RwLock};

use super::{BackendResult, ChangeKind, StatusChange, TableStore, CHANGE_CHANNEL_CAPACITY};
use crate::status::{Status, TableKey, TableNumber, TableStatus};

/// Table store backed by an ordered map
pub struct MemoryStore {
    rows: RwLock<BTreeMap<TableKey, Status>>,
    changes: broadcast::Sender<StatusChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rows: RwLock::new(BTreeMap::new()),
            changes,
        }
    }

    /// Store pre-filled with rows
    pub fn with_rows(rows: impl IntoIterator<Item = TableStatus>) -> Self {
        let map = rows.into_iter().map(|row| (row.key(), row.status)).collect();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rows: RwLock::new(map),
            changes,
        }
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn tables(&self, tournament_id: &str) -> BackendResult<Vec<TableStatus>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|(key, _)| key.tournament_id == tournament_id)
            .map(|(key, status)| {
                TableStatus::new(key.tournament_id.clone(), key.table_number, *status)
            })
            .collect())
    }

    async fn table(
        &self,
        tournament_id: &str,
        table_number: TableNumber,
    ) -> BackendResult<Option<TableStatus>> {
        let key = TableKey::new(tournament_id, table_number);
        let rows = self.rows.read().await;
        Ok(rows
            .get(&key)
            .map(|status| TableStatus::new(tournament_id, table_number, *status)))
    }

    async fn tournaments(&self) -> BackendResult<Vec<String>> {
        let rows = self.rows.read().await;
        let mut ids: Vec<String> = rows.keys().map(|k| k.tournament_id.clone()).collect();
        ids.dedup();
        Ok(ids)
    }

    async fn upsert(&self, row: &TableStatus) -> BackendResult<TableStatus> {
        let previous = self.rows.write().await.insert(row.key(), row.status);
        let kind = if previous.is_some() {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };

        let _ = self.changes.send(StatusChange::new(kind, row.clone()));
        Ok(row.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }

    async fn health_check(&self) -> BackendResult<()> {
        Ok(())
    }
}
