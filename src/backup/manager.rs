//! Backup orchestration
//!
//! One invocation resolves its targets, then for each database classifies,
//! dumps, optionally encrypts and uploads. Every target of a run shares the
//! same timestamp. Pruning runs once at the end over the whole prefix,
//! sparing the artifacts of any database whose backup failed.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use tempfile::NamedTempFile;

use crate::config::Settings;
use crate::crypto::EncryptionGate;
use crate::dump::DumpInvoker;
use crate::error::{BackupError, BackupResult};
use crate::models::artifact::{self, BackupArtifact};
use crate::storage::ArtifactStore;

use super::classify::classify;
use super::retention::{self, PruneReport};

/// A backup that reached the store
#[derive(Debug, Clone)]
pub struct UploadedBackup {
    pub artifact: BackupArtifact,
    pub key: String,
    pub size: u64,
}

/// Outcome of one backup run
#[derive(Debug)]
pub struct BackupReport {
    /// Timestamp shared by every artifact of the run
    pub timestamp: NaiveDateTime,
    pub uploaded: Vec<UploadedBackup>,
    /// Targets that failed, with their error
    pub failures: Vec<(String, BackupError)>,
    /// Present when the prune sweep ran
    pub prune: Option<PruneReport>,
    /// Set when the prune sweep could not list the store
    pub prune_error: Option<BackupError>,
}

impl BackupReport {
    fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            uploaded: Vec::new(),
            failures: Vec::new(),
            prune: None,
            prune_error: None,
        }
    }

    /// Number of targets attempted
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.prune_error.is_none()
    }

    /// Turn a report with failures into an error
    ///
    /// A run with a single failed target surfaces that target's own error.
    pub fn into_result(mut self) -> BackupResult<Self> {
        if !self.failures.is_empty() {
            let total = self.total();
            let failed = self.failures.len();
            if total == 1 {
                if let Some((_, err)) = self.failures.pop() {
                    return Err(err);
                }
            }
            return Err(BackupError::PartialFailure { failed, total });
        }
        match self.prune_error.take() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Runs backups against a store
///
/// Artifacts are encrypted iff a gate is supplied.
pub struct BackupManager<'a> {
    settings: &'a Settings,
    store: &'a dyn ArtifactStore,
    dumper: &'a dyn DumpInvoker,
    gate: Option<&'a dyn EncryptionGate>,
}

impl<'a> BackupManager<'a> {
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

    /// Database names this run operates on
    ///
    /// The server is only asked for its databases in all-databases mode.
    pub fn resolve_targets(&self) -> BackupResult<Vec<String>> {
        let available = if self.settings.target.is_all() {
            self.dumper.list_databases()?
        } else {
            Vec::new()
        };
        Ok(self.settings.target.expand(&available))
    }

    /// Back up every target now, then prune
    pub fn run(&self) -> BackupResult<BackupReport> {
        self.run_at(Local::now().naive_local(), Utc::now())
    }

    /// Back up every target with timestamp `taken_at`, pruning relative to `now`
    pub fn run_at(&self, taken_at: NaiveDateTime, now: DateTime<Utc>) -> BackupResult<BackupReport> {
        let targets = self.resolve_targets()?;
        let mut report = BackupReport::new(artifact::truncate_to_seconds(taken_at));

        if targets.is_empty() {
            tracing::warn!(target_spec = %self.settings.target, "No databases to back up");
        }

        for database in targets {
            match self.backup_database(&database, report.timestamp) {
                Ok(uploaded) => report.uploaded.push(uploaded),
                Err(e) => {
                    tracing::error!(database = %database, error = %e, "Backup failed");
                    report.failures.push((database, e));
                }
            }
        }

        if !self.settings.retention.is_disabled() {
            // Databases without a fresh artifact keep their old ones
            let failed: BTreeSet<String> =
                report.failures.iter().map(|(db, _)| db.clone()).collect();
            match retention::prune_sparing(
                self.store,
                self.prefix(),
                &self.settings.retention,
                now,
                &failed,
            ) {
                Ok(pruned) => report.prune = Some(pruned),
                Err(e) => {
                    tracing::error!(error = %e, "Retention sweep failed");
                    report.prune_error = Some(e);
                }
            }
        }

        Ok(report)
    }

    /// Classify, dump, encrypt and upload one database
    pub fn backup_database(
        &self,
        database: &str,
        taken_at: NaiveDateTime,
    ) -> BackupResult<UploadedBackup> {
        let classification = classify(self.store, self.prefix(), database, taken_at)?;
        let artifact = BackupArtifact::new(database, taken_at, classification, self.gate.is_some());
        let key = artifact.object_key(self.prefix());
        tracing::info!(database = %database, %classification, key = %key, "Starting backup");

        let tmp_dir = self.settings.tmp_dir.as_deref();
        let dump_file = scratch_file(tmp_dir, ".dump")?;
        self.dumper.dump(database, dump_file.path())?;

        let size = match self.gate {
            Some(gate) => {
                let encrypted = scratch_file(tmp_dir, ".dump.gpg")?;
                gate.encrypt(dump_file.path(), encrypted.path())?;
                dump_file.close()?;
                self.store.put_file(&key, encrypted.path())?
            }
            None => self.store.put_file(&key, dump_file.path())?,
        };

        tracing::info!(database = %database, key = %key, size, "Backup uploaded");

        if self.settings.latest_alias {
            let alias = artifact::latest_alias_key(self.prefix(), database, artifact.encrypted);
            if let Err(e) = self.store.copy(&key, &alias) {
                tracing::warn!(alias = %alias, error = %e, "Failed to update latest alias");
            }
        }

        Ok(UploadedBackup { artifact, key, size })
    }
}

/// Temporary file removed when dropped, in `dir` or the system temp dir
pub(crate) fn scratch_file(dir: Option<&Path>, suffix: &str) -> BackupResult<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pgbackup-").suffix(suffix);
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(file)
}
