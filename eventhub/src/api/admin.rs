//! Admin endpoints.
//!
//! - GET /api/admin/events?search= - Every event, latest first
//! - POST /api/admin/reminders - Remind attendees of events starting soon

use super::{ApiJson, ApiQuery, SearchParams};
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use seatledger_core::types::Event;
use seatledger_web::AppError;
use serde::{Deserialize, Serialize};

/// Request to send reminders.
#[derive(Debug, Default, Deserialize)]
pub struct RemindersRequest {
    /// Look-ahead in hours; the configured default when absent
    pub window_hours: Option<i64>,
}

/// Reminder run summary.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemindersResponse {
    /// Notifications dispatched
    pub sent: usize,
    /// Look-ahead used
    pub window_hours: i64,
}

/// Every event (past and upcoming), latest first; search on title and location.
pub async fn manage_events(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(state.catalog.manage(&admin.actor, params.term()).await?))
}

/// Dispatch a reminder to every attendee of events starting within the window.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/admin/reminders \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"window_hours": 24}'
/// ```
pub async fn send_reminders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(request): ApiJson<RemindersRequest>,
) -> Result<Json<RemindersResponse>, AppError> {
    let window = request
        .window_hours
        .map_or(state.reminder_window, chrono::Duration::hours);
    let sent = state.reminders.send_reminders(&admin.actor, window).await?;
    Ok(Json(RemindersResponse {
        sent,
        window_hours: window.num_hours(),
    }))
}
