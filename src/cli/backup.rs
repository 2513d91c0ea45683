//! Backup CLI commands
//!
//! Implements the `backup`, `list` and `prune` commands.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::backup::{retention, BackupManager};
use crate::error::BackupResult;
use crate::models::artifact::{self, Classification};

use super::Services;

/// Run one backup of every target, then prune
pub fn handle_backup(services: Services<'_>) -> BackupResult<()> {
    let settings = services.settings;
    println!(
        "Backing up {} to {}",
        settings.target,
        services.store.location()
    );

    let manager = BackupManager::new(settings, services.store, services.dumper, services.gate);
    let report = manager.run()?;

    for uploaded in &report.uploaded {
        println!(
            "  {} ({}, {})",
            uploaded.key,
            uploaded.artifact.classification,
            format_size(uploaded.size)
        );
    }
    for (database, err) in &report.failures {
        println!("  FAILED {}: {}", database, err);
    }
    if let Some(pruned) = &report.prune {
        println!(
            "Pruned {} expired backup(s), {} failed",
            pruned.deleted.len(),
            pruned.failed.len()
        );
    }

    let report = report.into_result()?;
    println!("Backup complete: {} database(s)", report.uploaded.len());
    Ok(())
}

/// One row of `list` output
#[derive(Debug, Serialize)]
struct ListedObject {
    key: String,
    database: Option<String>,
    timestamp: Option<NaiveDateTime>,
    classification: Option<Classification>,
    encrypted: Option<bool>,
    size: u64,
    last_modified: DateTime<Utc>,
}

/// Show every object under the prefix
///
/// Objects that are not backup artifacts are flagged rather than hidden.
pub fn handle_list(services: Services<'_>, verbose: bool, json: bool) -> BackupResult<()> {
    let prefix = &services.settings.storage.prefix;
    let objects = services.store.list(&artifact::key_prefix(prefix))?;

    let mut listed: Vec<ListedObject> = objects
        .into_iter()
        .map(|object| {
            let decoded = artifact::decode(prefix, &object.key).ok();
            ListedObject {
                database: decoded.as_ref().map(|a| a.database_name.clone()),
                timestamp: decoded.as_ref().map(|a| a.timestamp),
                classification: decoded.as_ref().map(|a| a.classification),
                encrypted: decoded.as_ref().map(|a| a.encrypted),
                key: object.key,
                size: object.size,
                last_modified: object.last_modified,
            }
        })
        .collect();

    // Newest first
    listed.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    if json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if listed.is_empty() {
        println!("No backups found in {}", services.store.location());
        println!("Create one with: pgbackup backup");
        return Ok(());
    }

    println!("Stored Backups");
    println!("==============");
    println!();

    let now = Utc::now();
    for (i, object) in listed.iter().enumerate() {
        let age_str = format_duration(now.signed_duration_since(object.last_modified));
        let marker = match object.classification {
            Some(Classification::Daily) => " [daily]",
            Some(Classification::Hourly) => "",
            None => " [unrecognized]",
        };

        if verbose {
            println!(
                "{}. {}{}\n   Modified: {}\n   Size: {}\n   Age: {}\n   Encrypted: {}\n",
                i + 1,
                object.key,
                marker,
                object.last_modified.format("%Y-%m-%d %H:%M:%S UTC"),
                format_size(object.size),
                age_str,
                match object.encrypted {
                    Some(true) => "Yes",
                    Some(false) => "No",
                    None => "-",
                },
            );
        } else {
            println!(
                "  {}. {} ({} ago, {}){}",
                i + 1,
                object.key,
                age_str,
                format_size(object.size),
                marker,
            );
        }
    }

    println!();
    println!("Total: {} object(s)", listed.len());
    Ok(())
}

/// Apply the retention windows now
pub fn handle_prune(services: Services<'_>, dry_run: bool) -> BackupResult<()> {
    let settings = services.settings;
    let policy = &settings.retention;

    if policy.is_disabled() {
        println!("No retention windows configured; nothing to prune.");
        println!("Set BACKUP_KEEP_DAYS and/or BACKUP_KEEP_HOURS to enable pruning.");
        return Ok(());
    }

    let plan = retention::plan_for_store(
        services.store,
        &settings.storage.prefix,
        policy,
        Utc::now(),
    )?;

    println!("Prune Summary");
    println!("=============");
    println!(
        "Retention policy: daily {}, hourly {}",
        policy
            .keep_days
            .map_or_else(|| "kept forever".to_string(), |d| format!("{} day(s)", d)),
        policy
            .keep_hours
            .map_or_else(|| "kept forever".to_string(), |h| format!("{} hour(s)", h)),
    );
    println!(
        "To be deleted: {} daily, {} hourly ({} total)",
        plan.daily.len(),
        plan.hourly.len(),
        plan.len()
    );
    if plan.unrecognized > 0 {
        println!("Skipped {} unrecognized object(s)", plan.unrecognized);
    }
    println!();

    if plan.is_empty() {
        println!("No backups to prune.");
        return Ok(());
    }

    if dry_run {
        for key in plan.keys() {
            println!("  would delete {}", key);
        }
        return Ok(());
    }

    let report = retention::apply_plan(services.store, &plan);
    println!("Deleted {} backup(s).", report.deleted.len());
    for (key, err) in &report.failed {
        println!("  failed to delete {}: {}", key, err);
    }
    Ok(())
}

/// Format a duration in human-readable form
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    let months = days / 30;
    format!("{}mo", months)
}

/// Format a file size in human-readable form
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
