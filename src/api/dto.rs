//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::status::{TableNumber, TableStatus};

// ============================================
// TOURNAMENT DTOs
// ============================================

/// Known tournaments
#[derive(Debug, Serialize, Deserialize)]
pub struct TournamentListResponse {
    pub tournaments: Vec<String>,
}

/// Rows of one tournament
#[derive(Debug, Serialize, Deserialize)]
pub struct TableListResponse {
    pub tournament_id: String,
    /// Ordered by table number
    pub tables: Vec<TableStatus>,
}

// ============================================
// TABLE DTOs
// ============================================

/// Register tables as observed; unseen ones start as `unknown`
#[derive(Debug, Deserialize)]
pub struct ObserveTablesRequest {
    pub table_numbers: Vec<TableNumber>,
}

/// Overwrite a table's status
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// One of `unknown`, `playing`, `covered`, `done`
    pub status: String,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded
    pub status: String,
    /// Backend status: ok, error
    pub backend: String,
    /// Open browser websocket connections
    pub ws_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
