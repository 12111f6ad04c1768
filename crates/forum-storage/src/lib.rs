//! Media storage abstraction for the forum.
//!
//! This crate defines the [`MediaBackend`] trait, a flat key-value store for
//! uploaded bytes (post images, videos, profile pictures). It knows nothing
//! about posts or users; `forum-core` decides the keys and records them in
//! the database.
//!
//! Two implementations are provided:
//!
//! - [`DiskBackend`] — production default, one file per key under a root directory
//! - [`MemoryBackend`] — in-memory, for testing only

mod disk;
mod error;
mod memory;

pub use disk::DiskBackend;
pub use error::StorageError;
pub use memory::MemoryBackend;

/// A pluggable storage backend for uploaded media.
///
/// Keys are flat file names (`3f9a1c2e-cat.png`); they never contain a path
/// separator. Values are the raw uploaded bytes.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait MediaBackend: Send + Sync + 'static {
    /// Retrieve a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails, or
    /// [`StorageError::InvalidKey`] if the key is not a flat file name.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a key-value pair, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Deleting a non-existent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the underlying backend fails.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List all keys that start with the given prefix, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the underlying backend fails.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Check whether a key exists.
    ///
    /// The default implementation calls [`get`](MediaBackend::get) and checks
    /// for `Some`. Backends may override this with a cheaper check.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Reject keys that could escape the storage root or are not flat names.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] describing the offending key.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key == "." || key == ".." {
        "key is a relative path component"
    } else if key.contains(['/', '\\', '\0']) {
        "key contains a path separator or NUL byte"
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidKey {
        key: key.to_owned(),
        reason: reason.to_owned(),
    })
}
