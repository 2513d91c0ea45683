//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup layer.

pub mod backup;
pub mod config;
pub mod restore;
pub mod run;

use crate::config::Settings;
use crate::crypto::EncryptionGate;
use crate::dump::DumpInvoker;
use crate::storage::ArtifactStore;

pub use backup::{handle_backup, handle_list, handle_prune};
pub use config::handle_config;
pub use restore::handle_restore;
pub use run::handle_run;

/// Collaborators shared by every command
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub settings: &'a Settings,
    pub store: &'a dyn ArtifactStore,
    pub dumper: &'a dyn DumpInvoker,
    /// Present iff a passphrase is configured
    pub gate: Option<&'a dyn EncryptionGate>,
}
