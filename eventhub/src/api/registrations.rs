//! Registration endpoints.
//!
//! - POST /api/events/:id/registrations - Claim a seat
//! - DELETE /api/registrations/:id - Give the seat back
//! - GET /api/me/registrations?filter=&search= - The caller's events
//!
//! All require authentication.

use super::{ApiPath, ApiQuery};
use crate::auth::SessionUser;
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use seatledger_core::types::{
    EventId, Registration, RegistrationFilter, RegistrationId, RegistrationWithEvent,
};
use seatledger_web::AppError;
use serde::Deserialize;

/// Query parameters for listing the caller's registrations.
#[derive(Debug, Default, Deserialize)]
pub struct MyRegistrationsQuery {
    /// `all` (default), `upcoming` or `past`
    #[serde(default)]
    pub filter: RegistrationFilter,
    /// Matches event title or location
    pub search: Option<String>,
}

/// Register the caller for an event.
///
/// Distinguishes 409 `SOLD_OUT`, 409 `ALREADY_REGISTERED`,
/// 409 `EVENT_ALREADY_STARTED` and 404 `EVENT_NOT_FOUND`.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/550e8400-.../registrations \
///   -H "Authorization: Bearer <token>"
/// ```
pub async fn register(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let registration = state.ledger.register(&session.actor, event_id).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Cancel one of the caller's registrations.
///
/// A repeated cancel reports 404 `REGISTRATION_NOT_FOUND` and changes nothing.
pub async fn cancel(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(registration_id): ApiPath<RegistrationId>,
) -> Result<StatusCode, AppError> {
    state.ledger.cancel(&session.actor, registration_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's registrations with their events, newest first.
pub async fn my_registrations(
    State(state): State<AppState>,
    session: SessionUser,
    ApiQuery(query): ApiQuery<MyRegistrationsQuery>,
) -> Result<Json<Vec<RegistrationWithEvent>>, AppError> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let registrations = state
        .catalog
        .my_registrations(&session.actor, query.filter, search)
        .await?;
    Ok(Json(registrations))
}
