//! Storage error types.
//!
//! Every variant carries the key or path involved and the backend's reason,
//! so a log line is enough to diagnose the failure.

/// Errors that can occur during media storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open the storage backend at the given path.
    #[error("failed to open media storage at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Failed to read a value from storage.
    #[error("failed to read media '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Failed to write a value to storage.
    #[error("failed to write media '{key}': {reason}")]
    Write { key: String, reason: String },

    /// Failed to delete a key from storage.
    #[error("failed to delete media '{key}': {reason}")]
    Delete { key: String, reason: String },

    /// Failed to list keys with the given prefix.
    #[error("failed to list media with prefix '{prefix}': {reason}")]
    List { prefix: String, reason: String },

    /// The key is not a flat file name.
    #[error("invalid media key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}
