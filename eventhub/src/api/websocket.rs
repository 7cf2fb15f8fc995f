//! Live event change endpoints.
//!
//! - GET /api/ws/events - Every change to any event row
//! - GET /api/ws/events/:id - Changes to one event row
//!
//! Public and read-only. Notices are relayed as described in
//! [`seatledger_web::handlers::websocket`].

use super::ApiPath;
use crate::server::state::AppState;
use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seatledger_core::feed::FeedScope;
use seatledger_core::types::EventId;
use seatledger_web::AppError;
use seatledger_web::handlers::websocket::relay_socket;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Active WebSocket connections across both endpoints.
static ACTIVE_CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

/// Maximum concurrent WebSocket connections.
const MAX_CONNECTIONS: usize = 1000;

/// One counted connection; the count drops when the socket closes.
struct ConnectionSlot;

impl ConnectionSlot {
    fn acquire() -> Option<Self> {
        let previous = ACTIVE_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
        if previous >= MAX_CONNECTIONS {
            ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::Relaxed);
            warn!(
                current_connections = previous,
                "WebSocket connection limit exceeded"
            );
            return None;
        }
        Some(Self)
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::Relaxed);
    }
}

fn too_many_connections() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "Too many concurrent connections. Please try again later.",
    )
        .into_response()
}

fn upgrade(ws: WebSocketUpgrade, state: &AppState, scope: FeedScope) -> Response {
    let Some(slot) = ConnectionSlot::acquire() else {
        return too_many_connections();
    };
    let changes = state.feed.subscribe(scope);
    info!(?scope, "WebSocket connection requested");
    ws.on_upgrade(move |socket| async move {
        let _slot = slot;
        relay_socket(socket, changes).await;
    })
}

/// Subscribe to changes of every event.
///
/// ```javascript
/// const ws = new WebSocket('ws://localhost:8080/api/ws/events');
/// ws.onmessage = (e) => {
///   const msg = JSON.parse(e.data);
///   if (msg.type === 'change') render(msg.event);
/// };
/// ```
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn all_events(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, &state, FeedScope::AllEvents)
}

/// Subscribe to changes of one event.
///
/// Answers 404 before upgrading when the event does not exist.
pub async fn event_changes(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Response, AppError> {
    state.catalog.get_event(event_id).await?;
    Ok(upgrade(ws, &state, FeedScope::Event(event_id)))
}
