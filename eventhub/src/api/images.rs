//! Event cover image upload.
//!
//! - POST /api/events/:id/image - Store the request body as the event's image (admin)
//!
//! The body is the raw image; `Content-Type` names its type. Accepted types
//! are JPEG, PNG, WebP and GIF. The size cap is enforced by the router's body
//! limit.
//!
//! The blob is written before the event row is pointed at it. When that
//! update fails the blob is removed again; a failed removal is logged with
//! its key at warn level.

use super::ApiPath;
use crate::auth::RequireAdmin;
use crate::blob::event_image_key;
use crate::server::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header::CONTENT_TYPE},
};
use seatledger_core::blob::image_extension;
use seatledger_core::error::LedgerError;
use seatledger_core::types::{Event, EventId, EventPatch};
use seatledger_web::AppError;

/// Upload a cover image and point the event at it.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/550e8400-.../image \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: image/png" \
///   --data-binary @cover.png
/// ```
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(event_id): ApiPath<EventId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Event>, AppError> {
    // Fail before writing a blob for an event that does not exist
    state.catalog.get_event(event_id).await?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let extension = image_extension(content_type).ok_or_else(|| {
        AppError::unsupported_media_type(format!(
            "Unsupported image type '{content_type}'; expected JPEG, PNG, WebP or GIF"
        ))
    })?;
    if body.is_empty() {
        return Err(AppError::validation("Image body is empty"));
    }

    let key = event_image_key(extension);
    let size = body.len();
    let url = state
        .blobs
        .put(&key, body.to_vec(), content_type)
        .await
        .map_err(LedgerError::from)?;
    tracing::info!(event_id = %event_id, %key, size, "Event image stored");

    let patch = EventPatch {
        image_url: Some(Some(url)),
        ..EventPatch::default()
    };
    match state
        .catalog
        .update_event(&admin.actor, event_id, patch)
        .await
    {
        Ok(event) => Ok(Json(event)),
        Err(err) => {
            if let Err(cleanup) = state.blobs.delete(&key).await {
                tracing::warn!(
                    event_id = %event_id,
                    %key,
                    error = %cleanup,
                    "Orphaned event image left in blob storage"
                );
            }
            Err(err.into())
        }
    }
}
