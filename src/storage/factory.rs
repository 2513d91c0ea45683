use crate::config::{StorageBackend, StorageSettings};

use super::backend::ObjectStoreBackend;
use super::traits::{ArtifactStore, StorageError, StorageResult};

/// Create a storage backend based on configuration
pub fn create_store(settings: &StorageSettings) -> StorageResult<Box<dyn ArtifactStore>> {
    match settings.backend {
        StorageBackend::S3 => {
            if settings.bucket.is_empty() {
                return Err(StorageError::ConfigError(
                    "S3_BUCKET not configured".to_string(),
                ));
            }
            Ok(Box::new(ObjectStoreBackend::s3(settings)?))
        }
        StorageBackend::Local => {
            let root = settings.local_path.as_ref().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            Ok(Box::new(ObjectStoreBackend::local(root)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(backend: StorageBackend) -> StorageSettings {
        StorageSettings {
            backend,
            bucket: String::new(),
            prefix: "backup".into(),
            region: "us-west-1".into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            local_path: None,
        }
    }

    #[test]
    fn test_s3_requires_bucket() {
        let result = create_store(&settings(StorageBackend::S3));
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_s3_with_endpoint() {
        let mut s = settings(StorageBackend::S3);
        s.bucket = "backups".into();
        s.endpoint = Some("http://localhost:9000".into());
        s.access_key_id = Some("minio".into());
        s.secret_access_key = Some("minio123".into());

        let store = create_store(&s).unwrap();
        assert_eq!(store.location(), "s3://backups via http://localhost:9000");
    }

    #[test]
    fn test_local_backend() {
        let temp = TempDir::new().unwrap();
        let mut s = settings(StorageBackend::Local);
        s.local_path = Some(temp.path().to_path_buf());

        let store = create_store(&s).unwrap();
        assert!(store.list("backup/").unwrap().is_empty());
    }
}
