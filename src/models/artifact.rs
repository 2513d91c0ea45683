//! Backup artifact naming
//!
//! Every stored backup is addressed by a canonical object key:
//!
//! ```text
//! {prefix}/{database}_{YYYY-MM-DDTHH:MM:SS}[_daily].dump[.gpg]
//! ```
//!
//! Encoding is a pure function of the database name, timestamp,
//! classification and encryption flag, and `decode` inverts it. Keys are
//! parsed from the right so database names containing `_` are recovered
//! intact.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{BackupError, BackupResult};

/// strftime format of the timestamp segment (second precision, host-local)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Length of a formatted timestamp segment
const TIMESTAMP_LEN: usize = 19;

const DAILY_SUFFIX: &str = "_daily";
const DUMP_EXTENSION: &str = ".dump";
const ENCRYPTED_EXTENSION: &str = ".gpg";
const LATEST_ALIAS: &str = "latest";

/// Retention class of a stored backup
///
/// Keys carry a `_daily` marker for daily artifacts and nothing otherwise,
/// so keys written before classification existed decode as `Hourly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// First backup of a database on a calendar day (long-lived window)
    Daily,
    /// Any other backup (short-lived window)
    Hourly,
}

impl Classification {
    fn suffix(self) -> &'static str {
        match self {
            Self::Daily => DAILY_SUFFIX,
            Self::Hourly => "",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Hourly => write!(f, "hourly"),
        }
    }
}

/// Reasons an object key is not a backup artifact
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("key is outside prefix '{0}'")]
    OutsidePrefix(String),

    #[error("unrecognized extension")]
    UnrecognizedExtension,

    #[error("missing timestamp segment")]
    MissingTimestamp,

    #[error("missing database name")]
    MissingDatabase,
}

/// One stored backup object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupArtifact {
    pub database_name: String,
    pub timestamp: NaiveDateTime,
    pub classification: Classification,
    pub encrypted: bool,
}

impl BackupArtifact {
    /// Create an artifact; the timestamp is truncated to whole seconds
    pub fn new(
        database_name: impl Into<String>,
        timestamp: NaiveDateTime,
        classification: Classification,
        encrypted: bool,
    ) -> Self {
        Self {
            database_name: database_name.into(),
            timestamp: truncate_to_seconds(timestamp),
            classification,
            encrypted,
        }
    }

    /// Canonical object key under `prefix`
    pub fn object_key(&self, prefix: &str) -> String {
        encode(
            prefix,
            &self.database_name,
            self.timestamp,
            self.classification,
            self.encrypted,
        )
    }

    /// Calendar day the backup was taken on
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn is_daily(&self) -> bool {
        self.classification == Classification::Daily
    }
}

/// Encode artifact attributes into an object key
pub fn encode(
    prefix: &str,
    database_name: &str,
    timestamp: NaiveDateTime,
    classification: Classification,
    encrypted: bool,
) -> String {
    format!(
        "{}{}_{}{}{}{}",
        key_prefix(prefix),
        database_name,
        timestamp.format(TIMESTAMP_FORMAT),
        classification.suffix(),
        DUMP_EXTENSION,
        if encrypted { ENCRYPTED_EXTENSION } else { "" },
    )
}

/// Decode an object key listed under `prefix` back into its attributes
pub fn decode(prefix: &str, key: &str) -> Result<BackupArtifact, KeyParseError> {
    let base = key_prefix(prefix);
    let name = key
        .strip_prefix(base.as_str())
        .ok_or_else(|| KeyParseError::OutsidePrefix(prefix.to_string()))?;

    let (name, encrypted) = match name.strip_suffix(ENCRYPTED_EXTENSION) {
        Some(rest) => (rest, true),
        None => (name, false),
    };

    let name = name
        .strip_suffix(DUMP_EXTENSION)
        .ok_or(KeyParseError::UnrecognizedExtension)?;

    let (name, classification) = match name.strip_suffix(DAILY_SUFFIX) {
        Some(rest) => (rest, Classification::Daily),
        None => (name, Classification::Hourly),
    };

    let split = name
        .len()
        .checked_sub(TIMESTAMP_LEN)
        .ok_or(KeyParseError::MissingTimestamp)?;
    let stamp = name.get(split..).ok_or(KeyParseError::MissingTimestamp)?;
    let timestamp = parse_timestamp_segment(stamp).ok_or(KeyParseError::MissingTimestamp)?;

    let database_name = name
        .get(..split)
        .and_then(|head| head.strip_suffix('_'))
        .ok_or(KeyParseError::MissingTimestamp)?;
    if database_name.is_empty() {
        return Err(KeyParseError::MissingDatabase);
    }

    Ok(BackupArtifact {
        database_name: database_name.to_string(),
        timestamp,
        classification,
        encrypted,
    })
}

/// `{prefix}/`, or the empty string for an empty prefix
pub fn key_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Listing prefix covering every artifact of one database
///
/// Other databases whose names start with `{database}_` also match, so
/// callers must still compare the decoded database name.
pub fn database_prefix(prefix: &str, database_name: &str) -> String {
    format!("{}{}_", key_prefix(prefix), database_name)
}

/// Narrowest listing prefix covering one database on one calendar day
pub fn day_prefix(prefix: &str, database_name: &str, day: NaiveDate) -> String {
    format!(
        "{}{}_{}T",
        key_prefix(prefix),
        database_name,
        day.format("%Y-%m-%d")
    )
}

/// Key of the optional "latest" alias; it has no timestamp and never decodes
pub fn latest_alias_key(prefix: &str, database_name: &str, encrypted: bool) -> String {
    format!(
        "{}{}_{}{}{}",
        key_prefix(prefix),
        database_name,
        LATEST_ALIAS,
        DUMP_EXTENSION,
        if encrypted { ENCRYPTED_EXTENSION } else { "" },
    )
}

/// Parse an operator-supplied timestamp (`YYYY-MM-DDTHH:MM:SS`)
pub fn parse_timestamp(input: &str) -> BackupResult<NaiveDateTime> {
    parse_timestamp_segment(input.trim())
        .ok_or_else(|| BackupError::InvalidTimestamp(input.to_string()))
}

fn parse_timestamp_segment(segment: &str) -> Option<NaiveDateTime> {
    if segment.len() != TIMESTAMP_LEN {
        return None;
    }
    NaiveDateTime::parse_from_str(segment, TIMESTAMP_FORMAT).ok()
}

/// Drop sub-second precision; keys carry whole seconds only
pub fn truncate_to_seconds(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp.with_nanosecond(0).unwrap_or(timestamp)
}
