//! Seat availability endpoints.
//!
//! - GET /api/events/:id/availability - Current seat counts (public)
//! - PUT /api/events/:id/capacity - Change total seats (admin)
//! - POST /api/events/:id/reconcile - Recompute free seats from registrations (admin)

use super::{ApiJson, ApiPath};
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use seatledger_core::types::{Availability, EventId};
use seatledger_web::AppError;
use serde::{Deserialize, Serialize};

/// Seat counts of one event.
#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    /// Event ID
    pub event_id: EventId,
    /// Capacity
    pub total_seats: u32,
    /// Seats still free
    pub available_seats: u32,
    /// Seats held by confirmed registrations
    pub taken_seats: u32,
    /// Whether no seat is left
    pub sold_out: bool,
}

impl From<Availability> for AvailabilityResponse {
    fn from(availability: Availability) -> Self {
        Self {
            event_id: availability.event_id,
            total_seats: availability.total_seats,
            available_seats: availability.available_seats,
            taken_seats: availability.taken(),
            sold_out: availability.is_sold_out(),
        }
    }
}

/// Request to change an event's capacity.
#[derive(Debug, Deserialize)]
pub struct CapacityRequest {
    /// New total seat count
    pub total_seats: u32,
}

/// Current seat counts.
///
/// Public endpoint.
///
/// ```bash
/// curl http://localhost:8080/api/events/550e8400-e29b-41d4-a716-446655440000/availability
/// # {"event_id":"550e...","total_seats":10,"available_seats":3,"taken_seats":7,"sold_out":false}
/// ```
pub async fn get_availability(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let availability = state.ledger.view_availability(event_id).await?;
    Ok(Json(availability.into()))
}

/// Change total seats.
///
/// Requires the admin role. Free seats move by the same delta; shrinking
/// below the number of confirmed registrations is refused with 409
/// `CAPACITY_BELOW_DEMAND`.
pub async fn adjust_capacity(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(event_id): ApiPath<EventId>,
    ApiJson(request): ApiJson<CapacityRequest>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let availability = state
        .ledger
        .adjust_capacity(&admin.actor, event_id, request.total_seats)
        .await?;
    Ok(Json(availability.into()))
}

/// Recompute free seats from the registration set.
///
/// Requires the admin role.
pub async fn reconcile(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let availability = state.ledger.reconcile(&admin.actor, event_id).await?;
    Ok(Json(availability.into()))
}
