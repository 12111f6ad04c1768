//! Uploaded media: classification, naming and storage.
//!
//! Attachments are accepted by extension only. Videos: `.mp4`, `.avi`,
//! `.mov`. Images: `.jpg`, `.jpeg`, `.png`, `.gif`. Stored keys get a short
//! random prefix so two uploads named `photo.png` never overwrite each other.

use std::path::Path;
use std::sync::Arc;

use forum_storage::MediaBackend;
use tracing::{info, warn};

use crate::error::MediaError;
use crate::models::AttachmentKind;

/// URL prefix under which stored media is served.
pub const MEDIA_URL_PREFIX: &str = "/img_video/";

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Decide whether `file_name` is an image or a video.
///
/// # Errors
///
/// Returns [`MediaError::Unsupported`] for any other extension, or none.
pub fn classify(file_name: &str) -> Result<AttachmentKind, MediaError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(AttachmentKind::Video)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(AttachmentKind::Image)
    } else {
        Err(MediaError::Unsupported {
            file_name: file_name.to_owned(),
        })
    }
}

/// Reduce a client-supplied file name to a safe flat name.
///
/// Keeps only the last path component (browsers on Windows may send
/// `C:\fakepath\cat.png`) and replaces anything outside `[A-Za-z0-9._-]`.
#[must_use]
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Public URL for a stored media key.
#[must_use]
pub fn media_url(key: &str) -> String {
    format!("{MEDIA_URL_PREFIX}{key}")
}

/// MIME type for serving a stored key, by extension.
#[must_use]
pub fn content_type(key: &str) -> &'static str {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// An upload that has been written to the media backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub key: String,
    pub kind: AttachmentKind,
}

/// Media store shared by post attachments and profile pictures.
#[derive(Clone)]
pub struct MediaLibrary {
    backend: Arc<dyn MediaBackend>,
}

impl std::fmt::Debug for MediaLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaLibrary").finish_non_exhaustive()
    }
}

impl MediaLibrary {
    #[must_use]
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self { backend }
    }

    /// Classify and store an upload under a fresh key.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Unsupported`] for unknown formats and
    /// [`MediaError::Storage`] if the backend write fails.
    pub async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<StoredMedia, MediaError> {
        let kind = classify(file_name)?;
        let prefix = uuid::Uuid::new_v4().simple().to_string();
        let key = format!("{}-{}", &prefix[..8], sanitize_file_name(file_name));

        self.backend.put(&key, bytes).await?;
        info!(key = %key, kind = %kind, bytes = bytes.len(), "media stored");

        Ok(StoredMedia { key, kind })
    }

    /// Read a stored upload. `Ok(None)` if the key is unknown or not a
    /// valid media key.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Storage`] if the backend read fails.
    pub async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, MediaError> {
        if forum_storage::validate_key(key).is_err() {
            return Ok(None);
        }
        Ok(self.backend.get(key).await?)
    }

    /// Best-effort removal of uploads whose database rows were never written.
    pub async fn discard(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.backend.delete(key).await {
                warn!(key = %key, error = %e, "failed to discard orphaned media");
            }
        }
    }

    /// Stored keys that start with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Storage`] if the backend listing fails.
    pub async fn keys(&self, prefix: &str) -> Result<Vec<String>, MediaError> {
        Ok(self.backend.list(prefix).await?)
    }
}
