//! Core data models for pgbackup
//!
//! Stored backup artifacts, their retention classification, and the
//! databases a run operates on.

pub mod artifact;
pub mod database;

pub use artifact::{BackupArtifact, Classification, KeyParseError};
pub use database::DatabaseTarget;
