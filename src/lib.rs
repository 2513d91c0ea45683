//! pgbackup - scheduled PostgreSQL backups to object storage
//!
//! This library dumps PostgreSQL databases, optionally encrypts the dumps with
//! gpg, uploads them to an object store under timestamped keys, and prunes
//! them with separate daily and hourly retention windows.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Environment-driven settings
//! - `error`: Custom error types
//! - `models`: Artifact naming and backup targets
//! - `storage`: Object store abstraction and backends
//! - `dump`: pg_dump / pg_restore invocation
//! - `crypto`: gpg encryption gate and secret handling
//! - `backup`: Classification, orchestration, restore and retention
//! - `schedule`: Cron schedule evaluation
//! - `cli`: Command handlers for the binary
//! - `logging`: tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use pgbackup::config::Settings;
//!
//! let settings = Settings::from_env()?;
//! println!("Backing up {}", settings.target);
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod dump;
pub mod error;
pub mod logging;
pub mod models;
pub mod schedule;
pub mod storage;

#[cfg(test)]
mod test_helpers;

pub use error::{BackupError, BackupResult};
