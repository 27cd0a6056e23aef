//! Table Routes
//!
//! Read and update table status rows.
//!
//! - GET /api/v1/tournaments - List known tournaments
//! - GET /api/v1/tournaments/:id/tables - Rows of one tournament
//! - POST /api/v1/tournaments/:id/tables - Observe tables (create as unknown)
//! - PUT /api/v1/tournaments/:id/tables/:number - Overwrite a status
//! - POST /api/v1/tournaments/:id/tables/:number/advance - Advance one step

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    ObserveTablesRequest, SetStatusRequest, TableListResponse, TournamentListResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::status::{Status, TableNumber, TableStatus};

/// Upper bound on tables observed in one request
const MAX_OBSERVE_BATCH: usize = 500;

/// GET /api/v1/tournaments
pub async fn list_tournaments(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<TournamentListResponse>> {
    let tournaments = state.store.tournaments().await?;
    Ok(Json(TournamentListResponse { tournaments }))
}

/// GET /api/v1/tournaments/:id/tables
pub async fn list_tables(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
) -> ApiResult<Json<TableListResponse>> {
    validate_tournament_id(&tournament_id)?;

    let tables = state.store.tables(&tournament_id).await?;
    Ok(Json(TableListResponse {
        tournament_id,
        tables,
    }))
}

/// POST /api/v1/tournaments/:id/tables
///
/// Returns every requested row, creating missing ones as `unknown`.
pub async fn observe_tables(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
    body: Result<Json<ObserveTablesRequest>, JsonRejection>,
) -> ApiResult<Json<TableListResponse>> {
    validate_tournament_id(&tournament_id)?;
    let Json(req) = body?;
    if req.table_numbers.is_empty() {
        return Err(ApiError::Validation("table_numbers must not be empty".to_string()));
    }
    if req.table_numbers.len() > MAX_OBSERVE_BATCH {
        return Err(ApiError::Validation(format!(
            "At most {} tables per request",
            MAX_OBSERVE_BATCH
        )));
    }

    let mut numbers = req.table_numbers;
    numbers.sort_unstable();
    numbers.dedup();

    let mut tables = Vec::with_capacity(numbers.len());
    for number in numbers {
        tables.push(state.store.observe(&tournament_id, number).await?);
    }

    Ok(Json(TableListResponse {
        tournament_id,
        tables,
    }))
}

/// PUT /api/v1/tournaments/:id/tables/:number
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, TableNumber)>, PathRejection>,
    body: Result<Json<SetStatusRequest>, JsonRejection>,
) -> ApiResult<Json<TableStatus>> {
    let Path((tournament_id, table_number)) = path?;
    validate_tournament_id(&tournament_id)?;
    let Json(req) = body?;
    let status = req
        .status
        .parse::<Status>()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let row = state
        .store
        .set_status(&tournament_id, table_number, status)
        .await?;
    Ok(Json(row))
}

/// POST /api/v1/tournaments/:id/tables/:number/advance
pub async fn advance(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, TableNumber)>, PathRejection>,
) -> ApiResult<Json<TableStatus>> {
    let Path((tournament_id, table_number)) = path?;
    validate_tournament_id(&tournament_id)?;

    let row = state.store.advance(&tournament_id, table_number).await?;
    tracing::info!(
        tournament_id = %row.tournament_id,
        table_number = row.table_number,
        status = %row.status,
        "Advanced table"
    );
    Ok(Json(row))
}

fn validate_tournament_id(id: &str) -> ApiResult<()> {
    if id.trim().is_empty() {
        return Err(ApiError::Validation("Tournament id is required".to_string()));
    }
    if id.len() > 128 {
        return Err(ApiError::Validation(
            "Tournament id too long (max 128 chars)".to_string(),
        ));
    }
    Ok(())
}
