//! Authentication extractors.
//!
//! - [`BearerToken`]: raw token from `Authorization: Bearer <token>`
//! - [`SessionUser`]: verified caller as an [`Actor`], role read from the
//!   profile store (no profile means a standard user)
//! - [`RequireAdmin`]: a [`SessionUser`] whose role is admin
//!
//! ```rust,ignore
//! async fn register(session: SessionUser, ...) -> Result<..., AppError> {
//!     state.ledger.register(&session.actor, event_id).await?;
//! }
//!
//! async fn create_event(RequireAdmin(admin): RequireAdmin, ...) -> Result<..., AppError> {
//!     state.catalog.create_event(&admin.actor, new_event).await?;
//! }
//! ```

use super::jwt::AuthError;
use crate::server::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use seatledger_core::error::LedgerError;
use seatledger_core::types::{Actor, Role, UserId};
use seatledger_web::AppError;

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MalformedHeader)?;

        Ok(Self(token.to_string()))
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser {
    /// Caller identity and role, passed into every service call
    pub actor: Actor,
}

impl SessionUser {
    /// The caller's user id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.actor.user_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Self>() {
            return Ok(*session);
        }

        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user_id = state.jwt.verify(&token)?;

        let role = state
            .profiles
            .get_profile(user_id)
            .await
            .map_err(LedgerError::from)?
            .map_or(Role::Standard, |profile| profile.role);

        let session = Self {
            actor: Actor { user_id, role },
        };
        tracing::debug!(user_id = %user_id, role = role.as_str(), "Session authenticated");
        parts.extensions.insert(session);
        Ok(session)
    }
}

/// Authenticated caller with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, state).await?;
        if session.actor.is_admin() {
            Ok(Self(session))
        } else {
            tracing::warn!(user_id = %session.user_id(), "Admin route refused");
            Err(LedgerError::AdminOnly.into())
        }
    }
}
