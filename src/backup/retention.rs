//! Retention pruning
//!
//! Two independent windows govern deletion: daily artifacts age out after
//! `keep_days` and hourly artifacts after `keep_hours`. Age is measured from
//! the store's `last_modified`, never from the timestamp in the key, since
//! the two diverge after server-side copies. Keys that do not decode are
//! never deleted.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::config::RetentionPolicy;
use crate::error::BackupResult;
use crate::models::artifact::{self, Classification};
use crate::storage::{ArtifactStore, StoredObject};

/// Keys selected for deletion, split by class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Expired daily artifacts
    pub daily: Vec<String>,
    /// Expired hourly artifacts (including unsuffixed legacy keys)
    pub hourly: Vec<String>,
    /// Objects under the prefix that are not backup artifacts
    pub unrecognized: usize,
}

impl RetentionPlan {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty() && self.hourly.is_empty()
    }

    pub fn len(&self) -> usize {
        self.daily.len() + self.hourly.len()
    }

    /// All keys to delete, in key order
    pub fn keys(&self) -> BTreeSet<String> {
        self.daily.iter().chain(self.hourly.iter()).cloned().collect()
    }

    /// Drop every planned key belonging to one of `databases`
    pub fn spare_databases(&mut self, prefix: &str, databases: &BTreeSet<String>) {
        if databases.is_empty() {
            return;
        }
        let keep = |key: &String| match artifact::decode(prefix, key) {
            Ok(found) => !databases.contains(&found.database_name),
            Err(_) => false,
        };
        self.daily.retain(keep);
        self.hourly.retain(keep);
    }
}

/// Outcome of applying a plan
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    /// Keys whose deletion failed, with the error message
    pub failed: Vec<(String, String)>,
}

/// Decide which objects have aged out of their window
pub fn plan_retention(
    objects: &[StoredObject],
    prefix: &str,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionPlan {
    let daily_cutoff = policy.keep_days.map(|d| now - Duration::days(i64::from(d)));
    let hourly_cutoff = policy.keep_hours.map(|h| now - Duration::hours(i64::from(h)));

    let mut plan = RetentionPlan::default();

    for object in objects {
        let found = match artifact::decode(prefix, &object.key) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(key = %object.key, reason = %e, "Not a backup artifact, keeping");
                plan.unrecognized += 1;
                continue;
            }
        };

        let (cutoff, bucket) = match found.classification {
            Classification::Daily => (daily_cutoff, &mut plan.daily),
            Classification::Hourly => (hourly_cutoff, &mut plan.hourly),
        };

        if let Some(cutoff) = cutoff {
            if object.last_modified <= cutoff {
                bucket.push(object.key.clone());
            }
        }
    }

    plan
}

/// Keys eligible for deletion under `policy` at `now`
pub fn compute_deletions(
    objects: &[StoredObject],
    prefix: &str,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> BTreeSet<String> {
    plan_retention(objects, prefix, policy, now).keys()
}

/// List everything under `prefix` and compute the plan
pub fn plan_for_store(
    store: &dyn ArtifactStore,
    prefix: &str,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> BackupResult<RetentionPlan> {
    let objects = store.list(&artifact::key_prefix(prefix))?;
    Ok(plan_retention(&objects, prefix, policy, now))
}

/// Delete every key in `plan`, one at a time
///
/// A failed delete is logged and recorded; the remaining keys are still
/// attempted.
pub fn apply_plan(store: &dyn ArtifactStore, plan: &RetentionPlan) -> PruneReport {
    let mut report = PruneReport::default();

    for key in plan.keys() {
        match store.delete(&key) {
            Ok(()) => {
                tracing::info!(key = %key, "Pruned expired backup");
                report.deleted.push(key);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to prune backup, continuing");
                report.failed.push((key, e.to_string()));
            }
        }
    }

    report
}

/// Sweep the whole prefix with the configured windows
pub fn prune(
    store: &dyn ArtifactStore,
    prefix: &str,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> BackupResult<PruneReport> {
    prune_sparing(store, prefix, policy, now, &BTreeSet::new())
}

/// Sweep the prefix, leaving every artifact of `spared` in place
pub fn prune_sparing(
    store: &dyn ArtifactStore,
    prefix: &str,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
    spared: &BTreeSet<String>,
) -> BackupResult<PruneReport> {
    if policy.is_disabled() {
        return Ok(PruneReport::default());
    }

    let mut plan = plan_for_store(store, prefix, policy, now)?;
    if !spared.is_empty() {
        tracing::warn!(
            databases = ?spared,
            "Sparing databases whose backup failed from the retention sweep"
        );
        plan.spare_databases(prefix, spared);
    }
    tracing::info!(
        daily = plan.daily.len(),
        hourly = plan.hourly.len(),
        unrecognized = plan.unrecognized,
        "Retention sweep planned"
    );

    Ok(apply_plan(store, &plan))
}
