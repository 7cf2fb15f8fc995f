//! Blob storage for event images.

use crate::error::StoreError;
use crate::store::StoreFuture;

/// Stores uploaded files and hands back a public URL.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the URL it is served from.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the blob could not be written.
    fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreFuture<'_, String>;

    /// Remove the blob under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the blob exists but could not be removed.
    fn delete(&self, key: &str) -> StoreFuture<'_, ()>;
}

/// Allowed image types and the extension they are stored with.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// File extension for an accepted image content type.
#[must_use]
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    IMAGE_TYPES
        .iter()
        .find(|(ct, _)| ct.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Reject keys that could escape the storage root.
///
/// # Errors
///
/// Returns [`StoreError::Corrupt`] for empty, absolute or `..` keys.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
        return Err(StoreError::Corrupt(format!("invalid blob key: {key}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_types() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("IMAGE/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(image_extension("text/html"), None);
    }

    #[test]
    fn keys_stay_inside_root() {
        assert!(validate_key("event-images/abc.png").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("").is_err());
    }
}
