//! `ArtifactStore` implementation over the `object_store` crate
//!
//! One adapter serves Amazon S3 (and S3-compatible endpoints such as MinIO),
//! the local filesystem, and the in-memory store used by tests. The
//! `object_store` API is async, so the adapter owns a current-thread tokio
//! runtime and blocks on each call; the rest of pgbackup stays synchronous.
//!
//! Keys are handed to `object_store` verbatim (`Path::parse`), so the key in
//! the bucket is byte-for-byte the key pgbackup encoded, reserved characters
//! in database names included.
//!
//! `object_store` lists whole path segments, so a string-prefix listing walks
//! the enclosing directory. It starts just below the prefix and, on stores
//! that list in key order (S3, in-memory), stops at the first key past it.
//! The local filesystem lists in no particular order and is always walked in
//! full.

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{Error as ObjectStoreError, ObjectStore, ObjectStoreExt, WriteMultipart};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::runtime::Runtime;

use crate::config::StorageSettings;

use super::traits::{ArtifactStore, StorageError, StorageResult, StoredObject};

/// Read size when streaming a local file into a multipart upload
const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Parts in flight at once during a multipart upload
const MAX_CONCURRENT_PARTS: usize = 4;

/// Blocking adapter around an `object_store::ObjectStore`
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    runtime: Runtime,
    location: String,
    /// Whether listings arrive in ascending key order
    ordered_listing: bool,
}

impl ObjectStoreBackend {
    /// Wrap an existing object store
    pub fn new(store: Arc<dyn ObjectStore>, location: impl Into<String>) -> StorageResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to start I/O runtime: {}", e)))?;

        Ok(Self {
            store,
            runtime,
            location: location.into(),
            ordered_listing: true,
        })
    }

    /// Amazon S3 or an S3-compatible provider
    ///
    /// Explicit credentials take precedence; otherwise the standard AWS
    /// environment and instance credential chain applies.
    pub fn s3(settings: &StorageSettings) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone());

        if let Some(ref access_key_id) = settings.access_key_id {
            builder = builder.with_access_key_id(access_key_id.clone());
        }
        if let Some(ref secret) = settings.secret_access_key {
            builder = builder.with_secret_access_key(secret.as_str());
        }
        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let location = match settings.endpoint {
            Some(ref endpoint) => format!("s3://{} via {}", settings.bucket, endpoint),
            None => format!("s3://{}", settings.bucket),
        };

        Self::new(Arc::new(store), location)
    }

    /// A directory on the local filesystem
    pub fn local(root: &FsPath) -> StorageResult<Self> {
        std::fs::create_dir_all(root)?;
        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        let mut backend = Self::new(Arc::new(store), format!("file://{}", root.display()))?;
        backend.ordered_listing = false;
        Ok(backend)
    }

    #[cfg(test)]
    pub fn in_memory() -> StorageResult<Self> {
        Self::new(Arc::new(object_store::memory::InMemory::new()), "memory://")
    }
}

impl ArtifactStore for ObjectStoreBackend {
    fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        let start = Instant::now();
        let directory = prefix
            .rfind('/')
            .map(|idx| object_path(&prefix[..idx]))
            .transpose()?;
        let offset = listing_offset(prefix)?;

        let objects = self.runtime.block_on(async {
            let mut stream = match offset {
                Some(ref offset) => self.store.list_with_offset(directory.as_ref(), offset),
                None => self.store.list(directory.as_ref()),
            };
            let mut objects = Vec::new();
            while let Some(meta) = stream.next().await {
                let meta = meta.map_err(|e| StorageError::BackendError(e.to_string()))?;
                let key = meta.location.to_string();
                if self.ordered_listing && key.as_str() > prefix && !key.starts_with(prefix) {
                    break;
                }
                if key.starts_with(prefix) {
                    objects.push(StoredObject {
                        key,
                        last_modified: meta.last_modified,
                        size: meta.size as u64,
                    });
                }
            }
            Ok::<_, StorageError>(objects)
        });

        let mut objects = objects.map_err(|e| {
            tracing::error!(
                error = %e,
                store = %self.location,
                prefix = %prefix,
                "Object listing failed"
            );
            e
        })?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!(
            store = %self.location,
            prefix = %prefix,
            count = objects.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Listed objects"
        );

        Ok(objects)
    }

    fn put_file(&self, key: &str, path: &FsPath) -> StorageResult<u64> {
        let start = Instant::now();
        let location = object_path(key)?;

        let result = self.runtime.block_on(async {
            let upload = self
                .store
                .put_multipart(&location)
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            let mut writer = WriteMultipart::new(upload);

            match copy_file_into(&mut writer, path).await {
                Ok(size) => {
                    writer
                        .finish()
                        .await
                        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
                    Ok(size)
                }
                Err(e) => {
                    if let Err(abort_err) = writer.abort().await {
                        tracing::warn!(error = %abort_err, key = %key, "Failed to abort upload");
                    }
                    Err(e)
                }
            }
        });

        match result {
            Ok(size) => {
                tracing::info!(
                    store = %self.location,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload successful"
                );
                Ok(size)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    store = %self.location,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload failed"
                );
                Err(e)
            }
        }
    }

    fn get_to_file(&self, key: &str, path: &FsPath) -> StorageResult<u64> {
        let start = Instant::now();
        let location = object_path(key)?;

        let size = self.runtime.block_on(async {
            let result = self.store.get(&location).await.map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
                other => StorageError::DownloadFailed(other.to_string()),
            })?;

            let mut file = tokio::fs::File::create(path).await?;
            let mut stream = result.into_stream();
            let mut size = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
                file.write_all(&chunk).await?;
                size += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<_, StorageError>(size)
        })?;

        tracing::info!(
            store = %self.location,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Download successful"
        );

        Ok(size)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let start = Instant::now();
        let location = object_path(key)?;

        self.runtime
            .block_on(self.store.delete(&location))
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
                other => StorageError::DeleteFailed(other.to_string()),
            })?;

        tracing::info!(
            store = %self.location,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Delete successful"
        );

        Ok(())
    }

    fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        let start = Instant::now();
        let from_location = object_path(from)?;
        let to_location = object_path(to)?;

        self.runtime
            .block_on(self.store.copy(&from_location, &to_location))
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(from.to_string()),
                other => StorageError::BackendError(other.to_string()),
            })?;

        tracing::info!(
            from_key = %from,
            to_key = %to,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Copy successful"
        );

        Ok(())
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

/// The object path for `key`, kept verbatim
///
/// `Path::from` would percent-encode characters such as `#` or `%`, and the
/// stored key would no longer match the one listed back.
fn object_path(key: &str) -> StorageResult<Path> {
    Path::parse(key)
        .map_err(|e| StorageError::BackendError(format!("Invalid object key '{}': {}", key, e)))
}

/// Offset just below every key starting with `prefix`
///
/// A proper prefix of a string sorts before it, so dropping the last
/// character of `prefix` yields an offset that every match is greater than.
fn listing_offset(prefix: &str) -> StorageResult<Option<Path>> {
    let trimmed = match prefix.char_indices().last() {
        Some((idx, _)) => &prefix[..idx],
        None => return Ok(None),
    };
    if trimmed.trim_matches('/').is_empty() {
        return Ok(None);
    }
    object_path(trimmed).map(Some)
}

/// Stream a local file into a multipart writer, returning the byte count
async fn copy_file_into(writer: &mut WriteMultipart, path: &FsPath) -> StorageResult<u64> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = vec![0u8; UPLOAD_CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        writer
            .wait_for_capacity(MAX_CONCURRENT_PARTS)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        writer.write(&buffer[..read]);
        size += read as u64;
    }

    Ok(size)
}
