//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::backend::TableStore;
use crate::config::{ApiConfig, Config};
use crate::routing::RouteTable;
use crate::theme::Theme;
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Table status rows, hosted or in-process
    pub store: Arc<dyn TableStore>,
    /// Resolves request paths to views
    pub routes: RouteTable,
    /// Colors for the rendered views
    pub theme: Arc<Theme>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for real-time streaming
    pub ws_hub: Arc<ConnectionHub>,
}

impl AppState {
    pub fn new(store: Arc<dyn TableStore>, config: &Config) -> Self {
        let hub_config = HubConfig {
            max_connections: config.api.max_ws_connections,
        };

        Self {
            store,
            routes: config.router.route_table(),
            theme: Arc::new(config.theme.clone()),
            config: Arc::new(config.api.clone()),
            start_time: Instant::now(),
            ws_hub: Arc::new(ConnectionHub::new(hub_config)),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}
