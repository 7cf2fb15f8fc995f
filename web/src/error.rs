//! Error types for web handlers.
//!
//! [`AppError`] is the single error type returned by handlers. Domain failures
//! arrive as [`LedgerError`] and keep their specific code (`SOLD_OUT`,
//! `ALREADY_REGISTERED`, ...) so clients can tell them apart; the HTTP status
//! follows the error's [`ErrorKind`]. Extractor rejections render the same
//! `{code, message}` body.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seatledger_core::error::{ErrorKind, LedgerError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Message shown instead of infrastructure failure details.
const UNAVAILABLE_MESSAGE: &str = "The service is temporarily unavailable; retry later";

/// Handler error rendered as a `{code, message}` JSON body.
///
/// ```ignore
/// async fn get_event(
///     State(state): State<AppState>,
///     ApiPath(event_id): ApiPath<EventId>,
/// ) -> Result<Json<Event>, AppError> {
///     Ok(Json(state.catalog.get_event(event_id).await?))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: Cow<'static, str>,
    message: String,
    /// Logged on 5xx, never sent to the client
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Error with an explicit status and code.
    #[must_use]
    pub fn new(
        status: StatusCode,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 400 `BAD_REQUEST`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 `UNAUTHORIZED`.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 404 `NOT_FOUND` for a resource other than an event or registration.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} {id} not found"),
        )
    }

    /// 415 `UNSUPPORTED_MEDIA_TYPE`.
    #[must_use]
    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UNSUPPORTED_MEDIA_TYPE",
            message,
        )
    }

    /// 422 `VALIDATION_ERROR`.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// 500 `INTERNAL_SERVER_ERROR`.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    /// Error for a request axum could not extract, keeping axum's status.
    fn rejected(status: StatusCode, message: String) -> Self {
        let code = match status {
            StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
            StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
            _ => "BAD_REQUEST",
        };
        Self::new(status, code, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                error = self.source.as_ref().map(tracing::field::display),
                "Request failed"
            );
        } else {
            tracing::debug!(status = %self.status, code = %self.code, "Request rejected");
        }

        let body = ErrorBody {
            code: self.code.into_owned(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Status code for a domain error class.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let status = status_for(err.kind());
        let code = err.code();
        match err {
            // Persistence details stay in the logs
            LedgerError::Unavailable(_) => {
                Self::new(status, code, UNAVAILABLE_MESSAGE).with_source(anyhow::Error::new(err))
            }
            err => Self::new(status, code, err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
