//! Effective configuration display
//!
//! Secrets print as `[REDACTED]` or not at all.

use crate::config::{Settings, StorageBackend};

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}

/// Print the effective configuration with secrets redacted
pub fn handle_config(settings: &Settings, location: &str) {
    let storage = &settings.storage;
    let postgres = &settings.postgres;

    println!("pgbackup Configuration");
    println!("======================");
    println!("Store:    {}", location);
    println!(
        "Backend:  {}",
        match storage.backend {
            StorageBackend::S3 => "s3",
            StorageBackend::Local => "local",
        }
    );
    println!("Prefix:   {}", storage.prefix);
    if storage.backend == StorageBackend::S3 {
        println!("Region:   {}", storage.region);
        println!("Endpoint: {}", or_unset(storage.endpoint.as_deref()));
        println!(
            "Credentials: {}",
            if storage.access_key_id.is_some() {
                "explicit"
            } else {
                "ambient"
            }
        );
    }
    println!();

    println!("PostgreSQL:");
    println!("  Server:   {}@{}:{}", postgres.user, postgres.host, postgres.port);
    println!("  Password: {}", postgres.password);
    println!("  Target:   {}", settings.target);
    if !postgres.dump_extra_opts.is_empty() {
        println!("  pg_dump options: {}", postgres.dump_extra_opts.join(" "));
    }
    println!();

    println!("Backups:");
    println!(
        "  Schedule:     {}",
        or_unset(settings.schedule.as_ref().map(|s| s.expression()))
    );
    println!(
        "  Keep daily:   {}",
        settings
            .retention
            .keep_days
            .map_or_else(|| "forever".to_string(), |d| format!("{} day(s)", d))
    );
    println!(
        "  Keep hourly:  {}",
        settings
            .retention
            .keep_hours
            .map_or_else(|| "forever".to_string(), |h| format!("{} hour(s)", h))
    );
    println!("  Encryption:   {}", if settings.is_encrypted() { "gpg" } else { "off" });
    println!("  Latest alias: {}", settings.latest_alias);
    if let Some(dir) = &settings.tmp_dir {
        println!("  Temp dir:     {}", dir.display());
    }
}
