//! # purplefox
//!
//! Tournament table status tracker. Floor staff mark each physical table of a
//! tournament as playing, covered or done; the rows live in a hosted
//! Postgres/realtime backend and every open view is kept current through
//! change notifications.
//!
//! ## Modules
//!
//! - [`status`]: Status values and their cycle
//! - [`backend`]: Typed access to the hosted backend (REST + realtime)
//! - [`routing`]: URL routes for the home and tournament views
//! - [`theme`]: Style configuration and status colors
//! - [`api`]: HTTP server with Axum
//! - [`websocket`]: Browser fan-out of table status changes
//! - [`config`]: Configuration file and environment handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use purplefox::backend::{BackendClient, TableStore};
//! use purplefox::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fails when SUPABASE_URL or SUPABASE_KEY is missing
//!     let config = Config::load_default(None)?;
//!     let client = BackendClient::from_config(&config.backend)?;
//!
//!     let row = client.advance("abc123", 4).await?;
//!     println!("Table {} is now {}", row.table_number, row.status);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod logging;
pub mod routing;
pub mod status;
pub mod theme;
pub mod websocket;

// Re-export top-level types for convenience
pub use status::{ParseStatusError, Status, TableKey, TableNumber, TableStatus};

pub use backend::{
    BackendClient, BackendError, BackendResult, ChangeKind, MemoryStore, RealtimeListener,
    StatusChange, TableStore,
};

pub use routing::{HistoryMode, Profile, Route, RouteTable};

pub use theme::{status_class, ColorToken, Theme};

pub use api::{build_router, serve, ApiError, AppState};

pub use websocket::{
    websocket_handler, ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
};

pub use config::{Config, ConfigError};
