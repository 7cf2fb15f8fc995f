//! API endpoints for the event registration service.
//!
//! Handlers by area:
//! - Events: browsing and admin CRUD, cover images
//! - Availability: seat counts, capacity changes, reconciliation
//! - Registrations: register, cancel, "my events"
//! - Feedback: post-event ratings
//! - Admin: management listing and reminders
//! - Profile: the caller's own profile
//! - WebSocket: live event changes

pub mod admin;
pub mod availability;
pub mod events;
pub mod feedback;
pub mod images;
pub mod profile;
pub mod registrations;
pub mod websocket;

use axum::extract::{FromRequest, FromRequestParts};
use seatledger_web::AppError;
use serde::Deserialize;

/// JSON body whose rejections render as `{code, message}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose rejections render as `{code, message}`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string whose rejections render as `{code, message}`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `?search=` on listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Case-insensitive substring filter
    pub search: Option<String>,
}

impl SearchParams {
    /// The search term, with blank input treated as no filter.
    #[must_use]
    pub fn term(self) -> Option<String> {
        self.search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
