//! WebSocket Real-Time Streaming
//!
//! Streams table status changes to browser views.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/api/v1/ws` and can subscribe to topics:
//! - `tournaments.*` - Every tournament
//! - `tournaments.{id}` - One tournament (e.g., `tournaments.abc123`)
//!
//! Subscribing to a single tournament is answered with a `snapshot` of its
//! current rows, followed by `table_status` messages as rows change.
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8084/api/v1/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['tournaments.abc123']}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'snapshot') render(msg.tables);
//!   if (msg.type === 'table_status') console.log(msg.table_number, msg.status);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError};
pub use messages::{
    topic_tournament, tournament_topic, ClientMessage, ServerMessage, WsEvent,
    ALL_TOURNAMENTS_TOPIC,
};
