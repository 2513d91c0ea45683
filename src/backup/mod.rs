//! Backup, restore and retention
//!
//! # Architecture
//!
//! - `classify`: decides whether a new backup is the day's daily artifact
//! - `BackupManager`: dumps, encrypts and uploads each target, then prunes
//! - `RestoreManager`: selects, downloads, decrypts and restores artifacts
//! - `retention`: the dual-window pruner
//!
//! # Retention Policy
//!
//! Daily artifacts live for `BACKUP_KEEP_DAYS` days and everything else for
//! `BACKUP_KEEP_HOURS` hours, measured from the store's modification time.
//! An unset window never deletes anything.
//!
//! # Example
//!
//! ```rust,ignore
//! use pgbackup::backup::BackupManager;
//! use pgbackup::config::Settings;
//! use pgbackup::dump::PgTools;
//! use pgbackup::storage::create_store;
//!
//! let settings = Settings::from_env()?;
//! let store = create_store(&settings.storage)?;
//! let tools = PgTools::new(settings.postgres.clone());
//!
//! let report = BackupManager::new(&settings, store.as_ref(), &tools, None)
//!     .run()?
//!     .into_result()?;
//! println!("{} backup(s) uploaded", report.uploaded.len());
//! ```

pub mod classify;
mod manager;
mod restore;
pub mod retention;

pub use classify::{classify, has_daily_artifact};
pub use manager::{BackupManager, BackupReport, UploadedBackup};
pub use restore::{latest_key, resolve, RestoreManager, RestoreReport, RestoredBackup};
pub use retention::{compute_deletions, prune, PruneReport, RetentionPlan};
