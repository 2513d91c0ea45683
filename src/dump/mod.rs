//! Dump and restore invocation
//!
//! The dump format is opaque to pgbackup: a dump is a local file produced by
//! one tool and consumed by another.

pub mod postgres;

use std::path::Path;

use crate::error::BackupResult;

pub use postgres::PgTools;

/// Produces and applies database dumps
pub trait DumpInvoker {
    /// Names of the non-template databases on the server
    fn list_databases(&self) -> BackupResult<Vec<String>>;

    /// Dump `database` into `output`
    fn dump(&self, database: &str, output: &Path) -> BackupResult<()>;

    /// Restore `input` into `database`, dropping and recreating its objects
    ///
    /// With `create`, the database itself is dropped and recreated first.
    fn restore(&self, database: &str, input: &Path, create: bool) -> BackupResult<()>;
}
