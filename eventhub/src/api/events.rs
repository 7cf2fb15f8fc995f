//! Event catalog endpoints.
//!
//! - GET /api/events?search= - Upcoming events, soonest first (public)
//! - GET /api/events/:id - Event details (public)
//! - POST /api/events - Create an event (admin)
//! - PUT /api/events/:id - Update descriptive fields (admin)
//! - DELETE /api/events/:id - Delete an event and its registrations (admin)

use super::{ApiJson, ApiPath, ApiQuery, SearchParams};
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use seatledger_core::types::{Event, EventId, EventPatch, NewEvent};
use seatledger_web::AppError;
use serde::{Deserialize, Deserializer};

// ============================================================================
// Request Types
// ============================================================================

/// Request to create a new event.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Event title
    pub title: String,
    /// Event description
    #[serde(default)]
    pub description: String,
    /// Where it takes place
    pub location: String,
    /// Start time
    pub event_date: DateTime<Utc>,
    /// Seat capacity
    pub total_seats: u32,
    /// Cover image URL
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(request: CreateEventRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            location: request.location,
            event_date: request.event_date,
            total_seats: request.total_seats,
            image_url: request.image_url,
        }
    }
}

/// Request to update an event.
///
/// Seat counts are not accepted here; capacity changes go through
/// `PUT /api/events/:id/capacity`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventRequest {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New start time
    pub event_date: Option<DateTime<Utc>>,
    /// New image URL; `null` clears it, absent leaves it alone
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateEventRequest> for EventPatch {
    fn from(request: UpdateEventRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            location: request.location,
            event_date: request.event_date,
            image_url: request.image_url,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List upcoming events.
///
/// Public endpoint. Only events that have not started, soonest first; the
/// search matches title, description and location.
///
/// ```bash
/// curl 'http://localhost:8080/api/events?search=rust'
/// ```
pub async fn browse_events(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(state.catalog.browse(params.term()).await?))
}

/// Get event details by ID.
///
/// Public endpoint.
pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(state.catalog.get_event(event_id).await?))
}

/// Create a new event.
///
/// Requires the admin role. All seats start available.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "title": "RustConf Meetup",
///     "description": "Talks and pizza",
///     "location": "Main Hall",
///     "event_date": "2025-06-01T18:00:00Z",
///     "total_seats": 80
///   }'
/// ```
pub async fn create_event(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(request): ApiJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state
        .catalog
        .create_event(&admin.actor, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Update an event's descriptive fields.
///
/// Requires the admin role.
pub async fn update_event(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(event_id): ApiPath<EventId>,
    ApiJson(request): ApiJson<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let event = state
        .catalog
        .update_event(&admin.actor, event_id, request.into())
        .await?;
    Ok(Json(event))
}

/// Delete an event.
///
/// Requires the admin role. Registrations and feedback go with it.
pub async fn delete_event(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_event(&admin.actor, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
