//! Configuration module for pgbackup
//!
//! All runtime options come from the environment and are validated once at
//! startup into an immutable [`Settings`] value.

pub mod settings;

pub use settings::{PostgresSettings, RetentionPolicy, Settings, StorageBackend, StorageSettings};
