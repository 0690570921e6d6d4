//! Uploaded image storage
//!
//! Images are written under the configured directory with a random name and
//! served back statically under the public base path.

use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;
use crate::config::UploadsConfig;
use crate::utils::errors::{EventHubError, Result};

/// An image received with an authoring request
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
    public_base: String,
    max_bytes: usize,
}

impl AssetStore {
    pub fn new(config: &UploadsConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            public_base: config.public_base.trim_end_matches('/').to_string(),
            max_bytes: config.max_bytes,
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Persist an image and return its public URL
    pub async fn store(&self, upload: ImageUpload) -> Result<String> {
        let content_type = upload.content_type.as_deref().unwrap_or_default();
        let Some(extension) = extension_for(content_type) else {
            return Err(EventHubError::validation(
                "image",
                "Only JPEG, PNG, GIF or WebP images are allowed",
            ));
        };
        if upload.bytes.is_empty() {
            return Err(EventHubError::validation("image", "image is required"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(EventHubError::validation(
                "image",
                format!("image must be at most {} bytes", self.max_bytes),
            ));
        }

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), &upload.bytes).await?;

        debug!(
            file = %file_name,
            original = ?upload.file_name,
            bytes = upload.bytes.len(),
            "Stored uploaded image"
        );
        Ok(format!("{}/{}", self.public_base, file_name))
    }

    /// Remove a previously stored image; failures are only logged
    pub async fn discard(&self, url: &str) {
        let Some(file_name) = url
            .strip_prefix(&self.public_base)
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
        else {
            return;
        };

        if let Err(e) = tokio::fs::remove_file(self.dir.join(file_name)).await {
            warn!(file = %file_name, error = %e, "Failed to remove discarded image");
        }
    }
}

/// Served extension for an accepted raster type; the client file name is never trusted
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, max_bytes: usize) -> AssetStore {
        AssetStore::new(&UploadsConfig {
            dir: dir.path().to_string_lossy().into_owned(),
            public_base: "/uploads/".to_string(),
            max_bytes,
        })
    }

    fn png(bytes: usize) -> ImageUpload {
        ImageUpload {
            bytes: vec![7u8; bytes],
            file_name: Some("poster.PNG".to_string()),
            content_type: Some("image/png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_store_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 1024);

        let url = store.store(png(16)).await.unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));

        let file_name = url.trim_start_matches("/uploads/");
        let written = std::fs::read(dir.path().join(file_name)).unwrap();
        assert_eq!(written.len(), 16);

        store.discard(&url).await;
        assert!(!dir.path().join(file_name).exists());
    }

    #[tokio::test]
    async fn test_rejects_non_images_and_oversize() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 8);

        let mut text = png(4);
        text.content_type = Some("text/plain".to_string());
        assert_matches!(
            store.store(text).await,
            Err(EventHubError::ValidationFailed { field: "image", .. })
        );
        assert_matches!(
            store.store(png(9)).await,
            Err(EventHubError::ValidationFailed { field: "image", .. })
        );
    }

    #[tokio::test]
    async fn test_scriptable_images_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 1024);

        let mut svg = png(16);
        svg.content_type = Some("image/svg+xml".to_string());
        svg.file_name = Some("poster.svg".to_string());
        assert_matches!(
            store.store(svg).await,
            Err(EventHubError::ValidationFailed { field: "image", .. })
        );

        let mut disguised = png(16);
        disguised.file_name = Some("poster.svg".to_string());
        let url = store.store(disguised).await.unwrap();
        assert!(url.ends_with(".png"));
    }

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp; q=1"), Some("webp"));
        assert_eq!(extension_for("image/svg+xml"), None);
        assert_eq!(extension_for("image/tiff"), None);
    }
}
