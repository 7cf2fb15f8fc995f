//! The caller's own profile.
//!
//! - GET /api/me - Read it
//! - PUT /api/me - Create or update name and email
//!
//! Roles are granted out of band; this endpoint never changes one.

use super::ApiJson;
use crate::auth::SessionUser;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use seatledger_core::error::LedgerError;
use seatledger_core::types::{Profile, Role};
use seatledger_web::AppError;
use serde::Deserialize;

/// Editable profile fields.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    /// Contact address
    pub email: String,
    /// Display name
    #[serde(default)]
    pub full_name: String,
}

/// The caller's profile.
pub async fn get_profile(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<Profile>, AppError> {
    state
        .profiles
        .get_profile(session.user_id())
        .await
        .map_err(LedgerError::from)?
        .map(Json)
        .ok_or_else(|| LedgerError::ProfileNotFound(session.user_id()).into())
}

/// Create or update the caller's profile.
///
/// A first write creates a standard user; later writes keep the stored role
/// and creation time.
pub async fn put_profile(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(request): ApiJson<ProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let email = request.email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("A valid email address is required"));
    }

    let profile = state
        .profiles
        .upsert_profile(Profile {
            id: session.user_id(),
            email,
            full_name: request.full_name.trim().to_string(),
            role: Role::Standard,
            created_at: state.clock.now(),
        })
        .await
        .map_err(LedgerError::from)?;
    Ok(Json(profile))
}
