//! Axum integration for the seat ledger.
//!
//! Application crates build their routers from these pieces:
//!
//! - [`AppError`]: the handler error type. Every
//!   [`LedgerError`](seatledger_core::LedgerError) converts into it with its
//!   specific code and a status derived from its kind.
//! - [`middleware`]: correlation ids, request spans, response counters and latency.
//! - [`handlers`]: liveness/readiness probes and the websocket relay of the
//!   event change feed.
//!
//! # Example
//!
//! ```ignore
//! use seatledger_web::{AppError, request_tracking_layer};
//! use axum::{Router, routing::post, extract::{Path, State}, Json};
//!
//! async fn register(
//!     State(state): State<AppState>,
//!     Path(event_id): Path<EventId>,
//!     session: SessionUser,
//! ) -> Result<Json<Registration>, AppError> {
//!     Ok(Json(state.ledger.register(&session.actor, event_id).await?))
//! }
//!
//! let app = Router::new()
//!     .route("/api/events/:id/registrations", post(register))
//!     .layer(request_tracking_layer())
//!     .with_state(app_state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, request_tracking_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
