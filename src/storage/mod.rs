//! Storage layer for pgbackup
//!
//! Backups live in an object store (Amazon S3, an S3-compatible service, or a
//! local directory). Everything above this module talks to the
//! [`ArtifactStore`] trait.

pub mod backend;
pub mod factory;
pub mod traits;

pub use backend::ObjectStoreBackend;
pub use factory::create_store;
pub use traits::{ArtifactStore, StorageError, StorageResult, StoredObject};
