//! Runtime settings for pgbackup
//!
//! Settings are read once at startup from environment variables and passed
//! by reference to every component. Empty variables count as unset, and all
//! validation happens here so that a bad configuration fails before any dump,
//! upload or delete is attempted.

use std::path::PathBuf;

use crate::crypto::SecureString;
use crate::error::{BackupError, BackupResult};
use crate::models::database::{default_ignore_list, parse_ignore_list, DatabaseTarget};
use crate::schedule::BackupSchedule;

const DEFAULT_S3_PREFIX: &str = "backup";
const DEFAULT_S3_REGION: &str = "us-west-1";
const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Backup retention windows
///
/// Each window is optional; an unset window means that class of artifact is
/// never pruned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Lifetime of daily artifacts, in days
    pub keep_days: Option<u32>,
    /// Lifetime of hourly artifacts, in hours
    pub keep_hours: Option<u32>,
}

impl RetentionPolicy {
    /// True when neither window is configured
    pub fn is_disabled(&self) -> bool {
        self.keep_days.is_none() && self.keep_hours.is_none()
    }
}

/// Which object store backs the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Amazon S3 or an S3-compatible endpoint
    S3,
    /// A directory on the local filesystem
    Local,
}

/// Object store settings
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub bucket: String,
    /// Key prefix without leading or trailing slashes
    pub prefix: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecureString>,
    /// Root directory for the local backend
    pub local_path: Option<PathBuf>,
}

/// Connection settings for the PostgreSQL server
#[derive(Debug, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecureString,
    /// Database used for maintenance queries in all-databases mode
    pub maintenance_database: String,
    /// Extra flags passed through to pg_dump
    pub dump_extra_opts: Vec<String>,
}

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: StorageSettings,
    pub postgres: PostgresSettings,
    pub target: DatabaseTarget,
    pub retention: RetentionPolicy,
    /// Present when dumps are encrypted
    pub passphrase: Option<SecureString>,
    pub schedule: Option<BackupSchedule>,
    /// Copy each upload to a `{db}_latest` alias key
    pub latest_alias: bool,
    /// Directory for scoped temporary files
    pub tmp_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> BackupResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> BackupResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let backend = match env.get("STORAGE_BACKEND").as_deref() {
            None | Some("s3") => StorageBackend::S3,
            Some("local") => StorageBackend::Local,
            Some(other) => {
                return Err(BackupError::Config(format!(
                    "STORAGE_BACKEND must be 's3' or 'local', got '{}'",
                    other
                )))
            }
        };

        let (bucket, local_path) = match backend {
            StorageBackend::S3 => (env.require("S3_BUCKET")?, None),
            StorageBackend::Local => (
                env.get("S3_BUCKET").unwrap_or_default(),
                Some(PathBuf::from(env.require("LOCAL_STORAGE_PATH")?)),
            ),
        };

        let storage = StorageSettings {
            backend,
            bucket,
            prefix: env
                .get("S3_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_S3_PREFIX.to_string()),
            region: env
                .get("S3_REGION")
                .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            endpoint: env.get("S3_ENDPOINT"),
            access_key_id: env.get("S3_ACCESS_KEY_ID"),
            secret_access_key: env.get("S3_SECRET_ACCESS_KEY").map(SecureString::from),
            local_path,
        };

        let backup_all = env.flag("POSTGRES_BACKUP_ALL")?;
        let target = if backup_all {
            DatabaseTarget::All {
                ignore: env
                    .get("IGNORE_DB_LIST")
                    .map(|list| parse_ignore_list(&list))
                    .unwrap_or_else(default_ignore_list),
            }
        } else {
            DatabaseTarget::Single(env.require("POSTGRES_DATABASE")?)
        };

        let postgres = PostgresSettings {
            host: env.require("POSTGRES_HOST")?,
            port: match env.get("POSTGRES_PORT") {
                Some(port) => port.parse().map_err(|_| {
                    BackupError::Config(format!("POSTGRES_PORT is not a valid port: '{}'", port))
                })?,
                None => DEFAULT_POSTGRES_PORT,
            },
            user: env.require("POSTGRES_USER")?,
            password: SecureString::from(env.require("POSTGRES_PASSWORD")?),
            maintenance_database: "postgres".to_string(),
            dump_extra_opts: env
                .get("PGDUMP_EXTRA_OPTS")
                .map(|opts| opts.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        };

        let retention = RetentionPolicy {
            keep_days: env.positive("BACKUP_KEEP_DAYS")?,
            keep_hours: env.positive("BACKUP_KEEP_HOURS")?,
        };

        let schedule = env
            .get("SCHEDULE")
            .map(|expr| BackupSchedule::parse(&expr))
            .transpose()?;

        Ok(Self {
            storage,
            postgres,
            target,
            retention,
            passphrase: env.get("PASSPHRASE").map(SecureString::from),
            schedule,
            latest_alias: env.flag("BACKUP_LATEST_ALIAS")?,
            tmp_dir: env.get("BACKUP_TMP_DIR").map(PathBuf::from),
        })
    }

    /// Whether artifacts are encrypted
    pub fn is_encrypted(&self) -> bool {
        self.passphrase.is_some()
    }
}

/// Environment accessor that treats empty values as unset
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> BackupResult<String> {
        self.get(key)
            .ok_or_else(|| BackupError::Config(format!("{} is required", key)))
    }

    fn flag(&self, key: &str) -> BackupResult<bool> {
        match self.get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("false") | Some("0") | Some("no") => Ok(false),
            Some("true") | Some("1") | Some("yes") => Ok(true),
            Some(other) => Err(BackupError::Config(format!(
                "{} must be true or false, got '{}'",
                key, other
            ))),
        }
    }

    fn positive(&self, key: &str) -> BackupResult<Option<u32>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => match value.parse::<u32>() {
                Ok(n) if n > 0 => Ok(Some(n)),
                _ => Err(BackupError::Config(format!(
                    "{} must be a positive integer, got '{}'",
                    key, value
                ))),
            },
        }
    }
}
