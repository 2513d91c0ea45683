//! Restore CLI command

use crate::backup::RestoreManager;
use crate::error::BackupResult;
use crate::models::artifact::parse_timestamp;

use super::Services;

/// Restore from the backup taken at `timestamp`, or the latest one
pub fn handle_restore(services: Services<'_>, timestamp: Option<String>) -> BackupResult<()> {
    let timestamp = timestamp.as_deref().map(parse_timestamp).transpose()?;

    match timestamp {
        Some(t) => println!("Restoring {} from backup taken at {}", services.settings.target, t),
        None => println!("Restoring {} from latest backup", services.settings.target),
    }

    let manager = RestoreManager::new(
        services.settings,
        services.store,
        services.dumper,
        services.gate,
    );
    let report = manager.restore(timestamp)?;

    for restored in &report.restored {
        println!("  {} <- {}", restored.database, restored.key);
    }
    for (database, err) in &report.failures {
        println!("  FAILED {}: {}", database, err);
    }

    let report = report.into_result()?;
    println!("Restore complete: {} database(s)", report.restored.len());
    Ok(())
}
