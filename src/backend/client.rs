//! Hosted Backend REST Client
//!
//! HTTP client for the backend's PostgREST interface.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::broadcast;

use super::realtime::RealtimeListener;
use super::{
    BackendError, BackendResult, ChangeKind, StatusChange, TableStore, CHANGE_CHANNEL_CAPACITY,
};
use crate::config::{BackendConfig, BackendCredentials, RealtimeConfig};
use crate::status::{TableNumber, TableStatus};

/// Upsert conflict target
const CONFLICT_COLUMNS: &str = "tournamentId,tableNumber";

/// Rows requested per page when scanning tournament ids
const TOURNAMENT_PAGE_SIZE: usize = 1000;

/// Process-wide handle to the hosted backend
pub struct BackendClient {
    http: Client,
    credentials: BackendCredentials,
    table: String,
    schema: String,
    realtime: RealtimeConfig,
    changes: broadcast::Sender<StatusChange>,
}

impl BackendClient {
    /// Build the client from configuration.
    ///
    /// Fails immediately when the endpoint URL or the API key is missing.
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let credentials = config.credentials()?;
        Self::new(credentials, config)
    }

    /// Build the client from already validated credentials
    pub fn new(credentials: BackendCredentials, config: &BackendConfig) -> BackendResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            http,
            credentials,
            table: config.table.clone(),
            schema: config.schema.clone(),
            realtime: config.realtime.clone(),
            changes,
        })
    }

    /// Endpoint URL this client talks to
    pub fn url(&self) -> &str {
        &self.credentials.url
    }

    /// Realtime listener feeding this client's subscribers, if enabled.
    ///
    /// The listener is not started; call [`RealtimeListener::spawn`].
    pub fn realtime_listener(&self) -> Option<RealtimeListener> {
        if !self.realtime.enabled {
            return None;
        }

        Some(RealtimeListener::new(
            &self.credentials,
            &self.schema,
            &self.table,
            self.realtime.clone(),
            self.changes.clone(),
        ))
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.credentials.url, self.table)
    }

    /// Request with authentication and schema headers
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method.clone(), url)
            .header("apikey", &self.credentials.key)
            .bearer_auth(&self.credentials.key);

        if self.schema != "public" {
            let header = if method == Method::GET {
                "Accept-Profile"
            } else {
                "Content-Profile"
            };
            builder = builder.header(header, &self.schema);
        }

        builder
    }

    async fn send(&self, builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await.map_err(map_request_error)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(BackendError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, query: &[(&str, String)]) -> BackendResult<T> {
        let builder = self.request(Method::GET, &self.table_url()).query(query);
        let response = self.send(builder).await?;
        decode(response).await
    }
}

#[async_trait]
impl TableStore for BackendClient {
    async fn tables(&self, tournament_id: &str) -> BackendResult<Vec<TableStatus>> {
        self.fetch(&[
            ("select", "*".to_string()),
            ("tournamentId", format!("eq.{}", tournament_id)),
            ("order", "tableNumber.asc".to_string()),
        ])
        .await
    }

    async fn table(
        &self,
        tournament_id: &str,
        table_number: TableNumber,
    ) -> BackendResult<Option<TableStatus>> {
        let rows: Vec<TableStatus> = self
            .fetch(&[
                ("select", "*".to_string()),
                ("tournamentId", format!("eq.{}", tournament_id)),
                ("tableNumber", format!("eq.{}", table_number)),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn tournaments(&self) -> BackendResult<Vec<String>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct TournamentRow {
            tournament_id: String,
        }

        // The server may cap rows per response below the page size, so keep
        // paging until a page comes back empty.
        let mut ids: Vec<String> = Vec::new();
        let mut offset = 0;
        loop {
            let page: Vec<TournamentRow> = self
                .fetch(&[
                    ("select", "tournamentId".to_string()),
                    ("order", "tournamentId.asc,tableNumber.asc".to_string()),
                    ("limit", TOURNAMENT_PAGE_SIZE.to_string()),
                    ("offset", offset.to_string()),
                ])
                .await?;
            if page.is_empty() {
                break;
            }

            offset += page.len();
            ids.extend(page.into_iter().map(|r| r.tournament_id));
            ids.dedup();
        }

        tracing::debug!(rows = offset, tournaments = ids.len(), "Scanned tournament ids");
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn upsert(&self, row: &TableStatus) -> BackendResult<TableStatus> {
        let builder = self
            .request(Method::POST, &self.table_url())
            .query(&[("on_conflict", CONFLICT_COLUMNS)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[row]);

        let response = self.send(builder).await?;
        let stored: Vec<TableStatus> = decode(response).await?;
        let stored = stored
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("upsert returned no representation".to_string()))?;

        tracing::info!(
            tournament_id = %stored.tournament_id,
            table_number = stored.table_number,
            status = %stored.status,
            "Stored table status"
        );

        // Without realtime nobody else reports our own writes
        if !self.realtime.enabled {
            let _ = self
                .changes
                .send(StatusChange::new(ChangeKind::Upsert, stored.clone()));
        }

        Ok(stored)
    }

    fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }

    async fn health_check(&self) -> BackendResult<()> {
        let builder = self
            .request(Method::GET, &self.table_url())
            .query(&[("select", "tournamentId"), ("limit", "1")]);
        self.send(builder).await.map(|_| ())
    }
}

fn map_request_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::Unavailable
    } else {
        BackendError::Request(e)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    let bytes = response.bytes().await.map_err(map_request_error)?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config() -> BackendConfig {
        let mut config = Config::default().backend;
        config.url = Some("https://demo.supabase.co/".to_string());
        config.key = Some("anon-key".to_string());
        config
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let result = BackendClient::from_config(&BackendConfig::default());
        assert!(matches!(result, Err(BackendError::Config(_))));
    }

    #[test]
    fn test_table_url() {
        let client = BackendClient::from_config(&config()).unwrap();
        assert_eq!(client.url(), "https://demo.supabase.co");
        assert_eq!(client.table_url(), "https://demo.supabase.co/rest/v1/table_status");
    }

    #[test]
    fn test_realtime_listener_follows_config() {
        let mut config = config();
        let client = BackendClient::from_config(&config).unwrap();
        assert!(client.realtime_listener().is_some());

        config.realtime.enabled = false;
        let client = BackendClient::from_config(&config).unwrap();
        assert!(client.realtime_listener().is_none());
    }
}
