//! Integration tests for the hosted backend REST client.
//!
//! Runs the client against a small in-process PostgREST stand-in that keeps
//! rows in memory and checks the authentication and upsert headers.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use purplefox::backend::{BackendClient, BackendError, ChangeKind, TableStore};
use purplefox::config::BackendConfig;
use purplefox::status::{Status, TableNumber, TableStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KEY: &str = "test-anon-key";

/// Rows per response, like PostgREST's `db-max-rows`
const MAX_ROWS: usize = 1000;

type Rows = Arc<Mutex<BTreeMap<(String, TableNumber), Status>>>;

fn authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(KEY) && bearer == Some(format!("Bearer {}", KEY).as_str())
}

fn eq_filter<'a>(params: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    params.get(column).and_then(|v| v.strip_prefix("eq."))
}

async fn select_rows(
    State(rows): State<Rows>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, r#"{"message":"Invalid API key"}"#).into_response();
    }

    let tournament = eq_filter(&params, "tournamentId");
    if tournament == Some("slow") {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    let table: Option<TableNumber> =
        eq_filter(&params, "tableNumber").and_then(|n| n.parse().ok());
    let offset: usize = params.get("offset").and_then(|n| n.parse().ok()).unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|n| n.parse().ok())
        .unwrap_or(MAX_ROWS)
        .min(MAX_ROWS);

    let matched: Vec<TableStatus> = rows
        .lock()
        .unwrap()
        .iter()
        .filter(|((t, _), _)| tournament.map_or(true, |want| want == t.as_str()))
        .filter(|((_, n), _)| table.map_or(true, |want| want == *n))
        .skip(offset)
        .take(limit)
        .map(|((t, n), s)| TableStatus::new(t.clone(), *n, *s))
        .collect();

    Json(matched).into_response()
}

async fn upsert_rows(
    State(rows): State<Rows>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Vec<TableStatus>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let prefer = headers.get("prefer").and_then(|v| v.to_str().ok()).unwrap_or("");
    if params.get("on_conflict").map(String::as_str) != Some("tournamentId,tableNumber")
        || !prefer.contains("resolution=merge-duplicates")
        || !prefer.contains("return=representation")
    {
        return (StatusCode::CONFLICT, "duplicate key value").into_response();
    }

    let mut stored = rows.lock().unwrap();
    for row in &body {
        stored.insert((row.tournament_id.clone(), row.table_number), row.status);
    }
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn spawn_backend(rows: Rows) -> String {
    let app = Router::new()
        .route("/rest/v1/table_status", get(select_rows).post(upsert_rows))
        .with_state(rows);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn backend_config(url: &str, key: &str) -> BackendConfig {
    let mut config = BackendConfig {
        url: Some(url.to_string()),
        key: Some(key.to_string()),
        ..BackendConfig::default()
    };
    config.realtime.enabled = false;
    config
}

async fn setup() -> (BackendClient, Rows) {
    let rows: Rows = Arc::new(Mutex::new(BTreeMap::new()));
    let url = spawn_backend(Arc::clone(&rows)).await;
    let client = BackendClient::from_config(&backend_config(&url, KEY)).unwrap();
    (client, rows)
}

#[tokio::test]
async fn test_upsert_creates_then_overwrites_status() {
    let (client, rows) = setup().await;

    let created = client
        .upsert(&TableStatus::new("abc123", 4, Status::Playing))
        .await
        .unwrap();
    assert_eq!(created, TableStatus::new("abc123", 4, Status::Playing));

    client
        .upsert(&TableStatus::new("abc123", 4, Status::Covered))
        .await
        .unwrap();

    let stored = rows.lock().unwrap().clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[&("abc123".to_string(), 4)], Status::Covered);
}

#[tokio::test]
async fn test_reads_filter_by_tournament_and_table() {
    let (client, rows) = setup().await;
    {
        let mut rows = rows.lock().unwrap();
        rows.insert(("abc123".to_string(), 2), Status::Done);
        rows.insert(("abc123".to_string(), 1), Status::Playing);
        rows.insert(("other".to_string(), 1), Status::Covered);
    }

    let tables = client.tables("abc123").await.unwrap();
    assert_eq!(
        tables.iter().map(|r| r.table_number).collect::<Vec<_>>(),
        vec![1, 2]
    );

    let row = client.table("abc123", 2).await.unwrap();
    assert_eq!(row.map(|r| r.status), Some(Status::Done));
    assert!(client.table("abc123", 9).await.unwrap().is_none());

    assert_eq!(client.tournaments().await.unwrap(), vec!["abc123", "other"]);
}

#[tokio::test]
async fn test_tournaments_beyond_row_cap() {
    let (client, rows) = setup().await;
    {
        let mut rows = rows.lock().unwrap();
        for table in 1..=1500 {
            rows.insert(("big".to_string(), table), Status::Unknown);
        }
        rows.insert(("zeta".to_string(), 1), Status::Playing);
    }

    assert_eq!(client.tournaments().await.unwrap(), vec!["big", "zeta"]);
}

#[tokio::test]
async fn test_advance_and_observe() {
    let (client, _rows) = setup().await;

    let observed = client.observe("t1", 3).await.unwrap();
    assert_eq!(observed.status, Status::Unknown);

    let statuses = [
        client.advance("t1", 3).await.unwrap().status,
        client.advance("t1", 3).await.unwrap().status,
        client.advance("t1", 3).await.unwrap().status,
        client.advance("t1", 3).await.unwrap().status,
    ];
    assert_eq!(
        statuses,
        [Status::Playing, Status::Covered, Status::Done, Status::Playing]
    );
}

#[tokio::test]
async fn test_local_writes_published_without_realtime() {
    let (client, _rows) = setup().await;
    let mut changes = client.subscribe();

    client.set_status("t1", 8, Status::Done).await.unwrap();

    let change = changes.recv().await.unwrap();
    assert_eq!(change.kind, ChangeKind::Upsert);
    assert_eq!(change.record, TableStatus::new("t1", 8, Status::Done));
}

#[tokio::test]
async fn test_wrong_key_is_api_error() {
    let rows: Rows = Arc::new(Mutex::new(BTreeMap::new()));
    let url = spawn_backend(rows).await;
    let client = BackendClient::from_config(&backend_config(&url, "wrong")).unwrap();

    match client.tables("abc123").await {
        Err(BackendError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("Invalid API key"));
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
    assert!(client.health_check().await.is_err());
}

#[tokio::test]
async fn test_unreachable_backend_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        BackendClient::from_config(&backend_config(&format!("http://{}", addr), KEY)).unwrap();
    assert!(matches!(
        client.tables("abc123").await,
        Err(BackendError::Unavailable)
    ));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let rows: Rows = Arc::new(Mutex::new(BTreeMap::new()));
    let url = spawn_backend(rows).await;
    let mut config = backend_config(&url, KEY);
    config.request_timeout_ms = 100;
    let client = BackendClient::from_config(&config).unwrap();

    assert!(matches!(
        client.tables("slow").await,
        Err(BackendError::Timeout)
    ));
}

#[test]
fn test_missing_credentials_fail_fast() {
    let mut config = backend_config("http://localhost:1", KEY);
    config.key = None;
    assert!(matches!(
        BackendClient::from_config(&config),
        Err(BackendError::Config(_))
    ));

    let mut config = backend_config("http://localhost:1", KEY);
    config.url = Some("  ".to_string());
    assert!(BackendClient::from_config(&config).is_err());
}
