//! Feedback endpoints.
//!
//! - PUT /api/events/:id/feedback/mine - Submit or replace the caller's feedback
//! - GET /api/events/:id/feedback/mine - The caller's feedback
//! - GET /api/events/:id/feedback - All feedback for an event (admin)

use super::{ApiJson, ApiPath};
use crate::auth::{RequireAdmin, SessionUser};
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use seatledger_core::store::FeedbackOutcome;
use seatledger_core::types::{EventId, Feedback};
use seatledger_web::AppError;
use serde::Deserialize;

/// Feedback submission.
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    /// 1 to 5 stars
    pub rating: u8,
    /// Free text
    #[serde(default)]
    pub comment: String,
}

/// Submit feedback for an event the caller attended.
///
/// 201 on first submission, 200 when replacing an earlier one.
pub async fn submit_mine(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(event_id): ApiPath<EventId>,
    ApiJson(request): ApiJson<FeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), AppError> {
    let outcome = state
        .feedback
        .submit_feedback(&session.actor, event_id, request.rating, request.comment)
        .await?;
    Ok(match outcome {
        FeedbackOutcome::Created(feedback) => (StatusCode::CREATED, Json(feedback)),
        FeedbackOutcome::Updated(feedback) => (StatusCode::OK, Json(feedback)),
    })
}

/// The caller's feedback for an event.
pub async fn get_mine(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<Feedback>, AppError> {
    state
        .feedback
        .my_feedback(&session.actor, event_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Feedback for event", event_id))
}

/// All feedback left for an event.
///
/// Requires the admin role.
pub async fn list_for_event(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<Vec<Feedback>>, AppError> {
    Ok(Json(
        state.feedback.event_feedback(&admin.actor, event_id).await?,
    ))
}
