//! Settings fixtures for testing

use crate::config::{PostgresSettings, RetentionPolicy, Settings, StorageBackend, StorageSettings};
use crate::models::database::parse_ignore_list;
use crate::models::DatabaseTarget;

/// Settings for a single database `app` under prefix `backup`
pub fn settings() -> Settings {
    Settings {
        storage: StorageSettings {
            backend: StorageBackend::S3,
            bucket: "backups".into(),
            prefix: "backup".into(),
            region: "us-west-1".into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            local_path: None,
        },
        postgres: PostgresSettings {
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: "pw".into(),
            maintenance_database: "postgres".into(),
            dump_extra_opts: Vec::new(),
        },
        target: DatabaseTarget::Single("app".into()),
        retention: RetentionPolicy::default(),
        passphrase: None,
        schedule: None,
        latest_alias: false,
        tmp_dir: None,
    }
}

/// All-databases settings with the given space-separated ignore list
pub fn all_databases(ignore: &str) -> Settings {
    Settings {
        target: DatabaseTarget::All {
            ignore: parse_ignore_list(ignore),
        },
        ..settings()
    }
}

/// Settings with encryption enabled
pub fn encrypted() -> Settings {
    Settings {
        passphrase: Some("pw".into()),
        ..settings()
    }
}
