//! Backup restoration
//!
//! Picks the artifact to restore, downloads it, decrypts it when encryption
//! is configured and hands it to the restore tool.
//!
//! An explicit timestamp maps straight to object keys without listing. The
//! classification suffix is part of the key, so both the hourly and the daily
//! form are candidates, tried in that order. Without a timestamp the
//! lexicographically greatest matching key wins; the fixed-width timestamp
//! makes that the most recent. Listing goes through `ArtifactStore::list`,
//! which consumes every page the backend returns, so "latest" is chosen among
//! all objects under the prefix however many there are.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::config::Settings;
use crate::crypto::EncryptionGate;
use crate::dump::DumpInvoker;
use crate::error::{BackupError, BackupResult};
use crate::models::artifact::{self, Classification};
use crate::storage::{ArtifactStore, StorageError};

use super::manager::scratch_file;

/// Keys to try, in order, when restoring `database`
pub fn resolve(
    store: &dyn ArtifactStore,
    prefix: &str,
    database: &str,
    timestamp: Option<NaiveDateTime>,
    encrypted: bool,
) -> BackupResult<Vec<String>> {
    match timestamp {
        Some(timestamp) => Ok([Classification::Hourly, Classification::Daily]
            .into_iter()
            .map(|class| artifact::encode(prefix, database, timestamp, class, encrypted))
            .collect()),
        None => latest_key(store, prefix, database, encrypted).map(|key| vec![key]),
    }
}

/// Most recent key of `database` with the given encryption setting
pub fn latest_key(
    store: &dyn ArtifactStore,
    prefix: &str,
    database: &str,
    encrypted: bool,
) -> BackupResult<String> {
    store
        .list(&artifact::database_prefix(prefix, database))?
        .into_iter()
        .filter(|object| match artifact::decode(prefix, &object.key) {
            Ok(found) => found.database_name == database && found.encrypted == encrypted,
            Err(_) => false,
        })
        .map(|object| object.key)
        .max()
        .ok_or_else(|| BackupError::backup_not_found(format!("latest backup of {}", database)))
}

/// A restore that completed
#[derive(Debug, Clone)]
pub struct RestoredBackup {
    pub database: String,
    pub key: String,
    pub size: u64,
}

/// Outcome of a restore run
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<RestoredBackup>,
    pub failures: Vec<(String, BackupError)>,
}

impl RestoreReport {
    pub fn total(&self) -> usize {
        self.restored.len() + self.failures.len()
    }

    /// Turn a report with failures into an error
    pub fn into_result(mut self) -> BackupResult<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        let total = self.total();
        let failed = self.failures.len();
        if total == 1 {
            if let Some((_, err)) = self.failures.pop() {
                return Err(err);
            }
        }
        Err(BackupError::PartialFailure { failed, total })
    }
}

/// Handles restoring from stored backups
pub struct RestoreManager<'a> {
    settings: &'a Settings,
    store: &'a dyn ArtifactStore,
    dumper: &'a dyn DumpInvoker,
    gate: Option<&'a dyn EncryptionGate>,
}

impl<'a> RestoreManager<'a> {
    pub fn new(
        settings: &'a Settings,
        store: &'a dyn ArtifactStore,
        dumper: &'a dyn DumpInvoker,
        gate: Option<&'a dyn EncryptionGate>,
    ) -> Self {
        Self {
            settings,
            store,
            dumper,
            gate,
        }
    }

    fn prefix(&self) -> &str {
        &self.settings.storage.prefix
    }

    fn encrypted(&self) -> bool {
        self.gate.is_some()
    }

    /// Restore the configured target from `timestamp`, or from the latest backup
    ///
    /// In all-databases mode each database found in the store is recreated
    /// from its own artifact; one failure does not stop the others.
    pub fn restore(&self, timestamp: Option<NaiveDateTime>) -> BackupResult<RestoreReport> {
        let mut report = RestoreReport::default();

        let (databases, create) = if self.settings.target.is_all() {
            (self.discover_databases(timestamp)?, true)
        } else {
            (self.settings.target.expand(&[]), false)
        };

        for database in databases {
            match self.restore_database(&database, timestamp, create) {
                Ok(restored) => report.restored.push(restored),
                Err(e) => {
                    tracing::error!(database = %database, error = %e, "Restore failed");
                    report.failures.push((database, e));
                }
            }
        }

        Ok(report)
    }

    /// Databases with restorable artifacts under the prefix
    ///
    /// With a timestamp only databases backed up at exactly that time count.
    pub fn discover_databases(&self, timestamp: Option<NaiveDateTime>) -> BackupResult<Vec<String>> {
        let found: BTreeSet<String> = self
            .store
            .list(&artifact::key_prefix(self.prefix()))?
            .iter()
            .filter_map(|object| artifact::decode(self.prefix(), &object.key).ok())
            .filter(|found| found.encrypted == self.encrypted())
            .filter(|found| timestamp.map_or(true, |t| found.timestamp == t))
            .filter(|found| !self.settings.target.is_ignored(&found.database_name))
            .map(|found| found.database_name)
            .collect();

        if found.is_empty() {
            let identifier = match timestamp {
                Some(t) => format!("any database at {}", t.format(artifact::TIMESTAMP_FORMAT)),
                None => "any database".to_string(),
            };
            return Err(BackupError::backup_not_found(identifier));
        }

        Ok(found.into_iter().collect())
    }

    /// Download, decrypt and restore one database
    pub fn restore_database(
        &self,
        database: &str,
        timestamp: Option<NaiveDateTime>,
        create: bool,
    ) -> BackupResult<RestoredBackup> {
        let candidates = resolve(self.store, self.prefix(), database, timestamp, self.encrypted())?;

        let tmp_dir = self.settings.tmp_dir.as_deref();
        let downloaded = scratch_file(tmp_dir, ".download")?;

        let mut fetched = None;
        for key in &candidates {
            match self.store.get_to_file(key, downloaded.path()) {
                Ok(size) => {
                    fetched = Some((key.clone(), size));
                    break;
                }
                Err(StorageError::NotFound(_)) => {
                    tracing::debug!(key = %key, "Candidate not in store");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let (key, size) = fetched.ok_or_else(|| BackupError::backup_not_found(candidates.join(" or ")))?;
        tracing::info!(database = %database, key = %key, size, "Downloaded backup");

        match self.gate {
            Some(gate) => {
                let decrypted = scratch_file(tmp_dir, ".dump")?;
                gate.decrypt(downloaded.path(), decrypted.path())?;
                downloaded.close()?;
                self.dumper.restore(database, decrypted.path(), create)?;
            }
            None => self.dumper.restore(database, downloaded.path(), create)?,
        }

        tracing::info!(database = %database, key = %key, "Restore complete");
        Ok(RestoredBackup {
            database: database.to_string(),
            key,
            size,
        })
    }
}
