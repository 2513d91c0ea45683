//! Object store abstraction
//!
//! This module defines the `ArtifactStore` trait that every storage backend
//! implements. The backup, pruning and restore logic only ever talks to this
//! trait, so tests can substitute an in-memory store.

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One entry of an object listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Full object key
    pub key: String,
    /// Modification time as reported by the store
    pub last_modified: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// Storage abstraction trait
///
/// Keys are plain strings such as `backup/app_2024-01-01T00:00:00.dump`.
/// Listing matches on raw string prefixes, not on directory boundaries, and
/// must return every matching object, however many pages the backend needs.
pub trait ArtifactStore {
    /// List every object whose key starts with `prefix`, sorted by key
    fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>>;

    /// Upload a local file to `key`, returning the number of bytes written
    fn put_file(&self, key: &str, path: &Path) -> StorageResult<u64>;

    /// Download `key` into a local file
    ///
    /// Returns `StorageError::NotFound` when the key does not exist.
    fn get_to_file(&self, key: &str, path: &Path) -> StorageResult<u64>;

    /// Delete a single object
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Server-side copy of `from` to `to`
    fn copy(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Human-readable location of the store (for logs and `config` output)
    fn location(&self) -> String;
}
