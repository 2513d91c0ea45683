//! Fake dump tool and encryption gate for testing

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;

use crate::crypto::EncryptionGate;
use crate::dump::DumpInvoker;
use crate::error::{BackupError, BackupResult};

const ENCRYPTED_MARKER: &[u8] = b"enc:";

/// Dump tool that writes `dump of {database}` and records restores
#[derive(Default)]
pub struct FakeDumper {
    databases: Vec<String>,
    failing: HashSet<String>,
    pub dumped: RefCell<Vec<String>>,
    /// (database, contents, create) for every restore call
    pub restored: RefCell<Vec<(String, Vec<u8>, bool)>>,
}

impl FakeDumper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Databases reported by `list_databases`
    pub fn with_databases(mut self, databases: &[&str]) -> Self {
        self.databases = databases.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Make dumps (and restores) of `database` fail
    pub fn failing_on(mut self, database: &str) -> Self {
        self.failing.insert(database.to_string());
        self
    }

    pub fn contents_for(database: &str) -> Vec<u8> {
        format!("dump of {}", database).into_bytes()
    }
}

impl DumpInvoker for FakeDumper {
    fn list_databases(&self) -> BackupResult<Vec<String>> {
        Ok(self.databases.clone())
    }

    fn dump(&self, database: &str, output: &Path) -> BackupResult<()> {
        if self.failing.contains(database) {
            return Err(BackupError::Dump(format!("pg_dump failed for {}", database)));
        }
        std::fs::write(output, Self::contents_for(database))?;
        self.dumped.borrow_mut().push(database.to_string());
        Ok(())
    }

    fn restore(&self, database: &str, input: &Path, create: bool) -> BackupResult<()> {
        if self.failing.contains(database) {
            return Err(BackupError::Restore(format!("pg_restore failed for {}", database)));
        }
        let contents = std::fs::read(input)?;
        self.restored
            .borrow_mut()
            .push((database.to_string(), contents, create));
        Ok(())
    }
}

/// Reversible "encryption" that prefixes a marker
#[derive(Default)]
pub struct FakeGate {
    wrong_passphrase: bool,
}

impl FakeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every decrypt fail as gpg does with a bad passphrase
    pub fn with_wrong_passphrase() -> Self {
        Self {
            wrong_passphrase: true,
        }
    }
}

impl EncryptionGate for FakeGate {
    fn encrypt(&self, input: &Path, output: &Path) -> BackupResult<()> {
        let mut data = ENCRYPTED_MARKER.to_vec();
        data.extend(std::fs::read(input)?);
        std::fs::write(output, data)?;
        Ok(())
    }

    fn decrypt(&self, input: &Path, output: &Path) -> BackupResult<()> {
        let data = std::fs::read(input)?;
        match data.strip_prefix(ENCRYPTED_MARKER) {
            Some(plain) if !self.wrong_passphrase => {
                std::fs::write(output, plain)?;
                Ok(())
            }
            _ => Err(BackupError::Encryption("decryption failed: bad session key".into())),
        }
    }
}
