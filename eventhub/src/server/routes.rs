//! Router configuration for the eventhub server.
//!
//! Builds the complete Axum router with all endpoints.

use super::state::AppState;
use crate::api::{
    admin, availability, events, feedback, images, profile, registrations, websocket,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use seatledger_web::handlers::{health_check, readiness_check};
use seatledger_web::request_tracking_layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `/health`, `/ready`: probes (no authentication)
/// - `/api/events...`: catalog, availability, registrations, feedback, images
/// - `/api/me...`: the caller's profile and registrations
/// - `/api/admin/...`: management listing and reminders
/// - `/api/ws/...`: live event changes
pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let api_routes = Router::new()
        // Catalog
        .route("/events", get(events::browse_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/:id/image",
            post(images::upload_image).layer(upload_limit),
        )
        // Seats
        .route(
            "/events/:id/availability",
            get(availability::get_availability),
        )
        .route("/events/:id/capacity", put(availability::adjust_capacity))
        .route("/events/:id/reconcile", post(availability::reconcile))
        .route(
            "/events/:id/registrations",
            post(registrations::register),
        )
        .route("/registrations/:id", delete(registrations::cancel))
        // Feedback
        .route("/events/:id/feedback", get(feedback::list_for_event))
        .route(
            "/events/:id/feedback/mine",
            get(feedback::get_mine).put(feedback::submit_mine),
        )
        // The caller
        .route("/me", get(profile::get_profile).put(profile::put_profile))
        .route("/me/registrations", get(registrations::my_registrations))
        // Admin
        .route("/admin/events", get(admin::manage_events))
        .route("/admin/reminders", post(admin::send_reminders))
        // Live changes
        .route("/ws/events", get(websocket::all_events))
        .route("/ws/events/:id", get(websocket::event_changes));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(request_tracking_layer())
        .with_state(state)
}
