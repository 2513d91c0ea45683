//! Scheduled backup loop

use chrono::Local;

use crate::error::BackupResult;

use super::{handle_backup, Services};

/// Back up on every `SCHEDULE` tick, or once when no schedule is set
///
/// A failed run is logged and the loop waits for the next tick.
pub fn handle_run(services: Services<'_>) -> BackupResult<()> {
    let schedule = match &services.settings.schedule {
        Some(schedule) => schedule,
        None => return handle_backup(services),
    };

    tracing::info!(schedule = %schedule.expression(), "Starting backup schedule");

    loop {
        let now = Local::now();
        let next = schedule.next_after(&now)?;
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next = %next.format("%Y-%m-%dT%H:%M:%S"), "Waiting for next backup");
        std::thread::sleep(wait);

        if let Err(e) = handle_backup(services) {
            tracing::error!(error = %e, "Scheduled backup failed");
        }
    }
}
