//! Cron scheduling for recurring backups
//!
//! `SCHEDULE` accepts standard five-field cron expressions, six- or
//! seven-field expressions with seconds, and the `@hourly`/`@daily`-style
//! shortcuts. Fire times are computed in the host's local time zone, the same
//! clock backup timestamps use.

use std::str::FromStr;

use chrono::{DateTime, Local};
use cron::Schedule;

use crate::error::{BackupError, BackupResult};

/// A parsed `SCHEDULE` expression
#[derive(Debug, Clone)]
pub struct BackupSchedule {
    expression: String,
    schedule: Schedule,
}

impl BackupSchedule {
    /// Parse a cron expression
    pub fn parse(expression: &str) -> BackupResult<Self> {
        let expression = expression.trim();
        let normalized = normalize(expression);
        let schedule = Schedule::from_str(&normalized).map_err(|e| {
            BackupError::Config(format!("SCHEDULE '{}' is not valid: {}", expression, e))
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// The expression as configured
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `now`
    pub fn next_after(&self, now: &DateTime<Local>) -> BackupResult<DateTime<Local>> {
        self.schedule.after(now).next().ok_or_else(|| {
            BackupError::Schedule(format!("'{}' has no upcoming fire time", self.expression))
        })
    }
}

/// The cron parser expects a seconds field; classic crontab lines lack one
fn normalize(expression: &str) -> String {
    if expression.starts_with('@') {
        return expression.to_string();
    }
    if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    }
}
