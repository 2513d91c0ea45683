//! Daily/hourly classification
//!
//! Whether a new backup is the day's daily artifact is decided from what is
//! already in the store, queried fresh on every run. Retried or drifting
//! schedules therefore reach the same answer as long as the earlier attempt
//! never finished its upload.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::artifact::{self, Classification};
use crate::storage::{ArtifactStore, StorageResult};

/// True iff a daily artifact for `database` on `day` is already stored
///
/// Lists with the narrowest prefix (database and day) and decodes each key;
/// keys that fail to decode are ignored.
pub fn has_daily_artifact(
    store: &dyn ArtifactStore,
    prefix: &str,
    database: &str,
    day: NaiveDate,
) -> StorageResult<bool> {
    let listing = store.list(&artifact::day_prefix(prefix, database, day))?;

    Ok(listing.iter().any(|object| {
        match artifact::decode(prefix, &object.key) {
            Ok(found) => found.is_daily() && found.database_name == database && found.day() == day,
            Err(e) => {
                tracing::debug!(key = %object.key, reason = %e, "Skipping non-backup object");
                false
            }
        }
    }))
}

/// Classification for a backup of `database` taken at `timestamp`
pub fn classify(
    store: &dyn ArtifactStore,
    prefix: &str,
    database: &str,
    timestamp: NaiveDateTime,
) -> StorageResult<Classification> {
    if has_daily_artifact(store, prefix, database, timestamp.date())? {
        Ok(Classification::Hourly)
    } else {
        Ok(Classification::Daily)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::artifact::{encode, TIMESTAMP_FORMAT};
    use crate::test_helpers::MockStore;
    use chrono::Utc;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn store_with(keys: &[&str]) -> MockStore {
        let store = MockStore::new();
        for key in keys {
            store.insert(key, b"x", Utc::now());
        }
        store
    }

    #[test]
    fn test_empty_store_has_no_daily() {
        let store = MockStore::new();
        let day = ts("2024-03-10T00:00:00").date();
        assert!(!has_daily_artifact(&store, "backup", "app", day).unwrap());
        assert_eq!(
            classify(&store, "backup", "app", ts("2024-03-10T08:00:00")).unwrap(),
            Classification::Daily
        );
    }

    #[test]
    fn test_daily_at_any_time_of_day_counts() {
        let key = encode("backup", "app", ts("2024-03-10T23:59:59"), Classification::Daily, false);
        let store = store_with(&[&key]);
        assert_eq!(
            classify(&store, "backup", "app", ts("2024-03-10T00:00:01")).unwrap(),
            Classification::Hourly
        );
    }

    #[test]
    fn test_hourly_artifacts_do_not_count() {
        let key = encode("backup", "app", ts("2024-03-10T01:00:00"), Classification::Hourly, false);
        let store = store_with(&[&key]);
        let day = ts("2024-03-10T00:00:00").date();
        assert!(!has_daily_artifact(&store, "backup", "app", day).unwrap());
    }

    #[test]
    fn test_other_days_and_databases_do_not_count() {
        let yesterday = encode("backup", "app", ts("2024-03-09T00:00:00"), Classification::Daily, false);
        let other_db = encode("backup", "app_v2", ts("2024-03-10T00:00:00"), Classification::Daily, false);
        let store = store_with(&[&yesterday, &other_db]);
        let day = ts("2024-03-10T00:00:00").date();
        assert!(!has_daily_artifact(&store, "backup", "app", day).unwrap());
    }

    #[test]
    fn test_encrypted_daily_counts() {
        let key = encode("backup", "app", ts("2024-03-10T00:00:00"), Classification::Daily, true);
        let store = store_with(&[&key, "backup/app_2024-03-10Tgarbage.dump"]);
        let day = ts("2024-03-10T00:00:00").date();
        assert!(has_daily_artifact(&store, "backup", "app", day).unwrap());
    }
}
