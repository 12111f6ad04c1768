//! Filesystem media backend — the production default.
//!
//! Each key is stored as one file directly under the root directory, which
//! is the directory the original deployment served uploads from
//! (`./img_video`). Writes go to a hidden temporary file first and are
//! renamed into place so a reader never observes a half-written upload.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{MediaBackend, StorageError, validate_key};

/// Suffix for in-flight writes; such files are skipped by [`DiskBackend::list`].
const TMP_SUFFIX: &str = ".partial";

/// A media backend that stores one file per key under a root directory.
///
/// # Examples
///
/// ```no_run
/// # use forum_storage::DiskBackend;
/// let backend = DiskBackend::open("./img_video").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    /// Open (and create if missing) the media directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the directory cannot be created or
    /// the path exists but is not a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| StorageError::Open {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

        if !root.is_dir() {
            return Err(StorageError::Open {
                path: root.display().to_string(),
                reason: "not a directory".to_owned(),
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Return the root directory of this backend.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait::async_trait]
impl MediaBackend for DiskBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                key: key.to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!(".{key}{TMP_SUFFIX}"));
        let write_err = |e: std::io::Error| StorageError::Write {
            key: key.to_owned(),
            reason: e.to_string(),
        };

        tokio::fs::write(&tmp, value).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        debug!(key, bytes = value.len(), "media written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete {
                key: key.to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let list_err = |e: std::io::Error| StorageError::List {
            prefix: prefix.to_owned(),
            reason: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(list_err)?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !name.starts_with(prefix) {
                continue;
            }
            if entry.file_type().await.map_err(list_err)?.is_file() {
                keys.push(name);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::Read {
                key: key.to_owned(),
                reason: e.to_string(),
            })
    }
}
