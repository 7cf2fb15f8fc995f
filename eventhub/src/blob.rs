//! Filesystem blob store for event images.

use crate::config::BlobConfig;
use rand::Rng;
use rand::distributions::Alphanumeric;
use seatledger_core::blob::{BlobStore, validate_key};
use seatledger_core::error::StoreError;
use seatledger_core::store::StoreFuture;
use std::path::PathBuf;

/// Prefix under which event cover images are stored.
pub const EVENT_IMAGE_PREFIX: &str = "event-images";

const NAME_LEN: usize = 13;

/// Fresh key `event-images/<random>.<ext>` for an uploaded image.
#[must_use]
pub fn event_image_key(extension: &str) -> String {
    let name: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{EVENT_IMAGE_PREFIX}/{name}.{extension}")
}

/// Writes blobs under a directory that is served at a public base URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    /// Store blobs under `root`, served from `public_base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Store configured by [`BlobConfig`].
    #[must_use]
    pub fn from_config(config: &BlobConfig) -> Self {
        Self::new(config.dir.clone(), &config.public_base_url)
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        validate_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(format!("create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StoreError::Unavailable(format!("write {}: {e}", path.display())))?;
        Ok(format!("{}/{key}", self.public_base_url))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreFuture<'_, String> {
        let key = key.to_owned();
        let size = bytes.len();
        tracing::debug!(%key, size, content_type, "Storing blob");
        Box::pin(async move { self.write(&key, bytes).await })
    }

    fn delete(&self, key: &str) -> StoreFuture<'_, ()> {
        let key = key.to_owned();
        Box::pin(async move {
            validate_key(&key)?;
            let path = self.root.join(&key);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::Unavailable(format!(
                    "remove {}: {e}",
                    path.display()
                ))),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_keys_are_random_and_prefixed() {
        let a = event_image_key("png");
        let b = event_image_key("png");
        assert_ne!(a, b);
        assert!(a.starts_with("event-images/"));
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), "event-images/".len() + NAME_LEN + ".png".len());
    }

    #[tokio::test]
    async fn test_put_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "https://cdn.example.com/static/");

        let url = store
            .put("event-images/abc.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/static/event-images/abc.png");
        let written = tokio::fs::read(dir.path().join("event-images/abc.png"))
            .await
            .unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_put_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost/static");

        let result = store.put("../outside.png", vec![0], "image/png").await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost/static");
        store
            .put("event-images/gone.png", vec![7], "image/png")
            .await
            .unwrap();

        store.delete("event-images/gone.png").await.unwrap();
        assert!(!dir.path().join("event-images/gone.png").exists());
        store.delete("event-images/gone.png").await.unwrap();
    }
}
