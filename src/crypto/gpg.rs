//! Symmetric encryption through `gpg`
//!
//! Artifacts are encrypted with `gpg --symmetric` so they stay readable by
//! standard tooling. The passphrase is written to gpg's stdin
//! (`--passphrase-fd 0`) and never appears on the command line.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{BackupError, BackupResult};

use super::secure_memory::SecureString;

/// Transforms a local file to and from its encrypted form
pub trait EncryptionGate {
    /// Encrypt `input` into `output`
    fn encrypt(&self, input: &Path, output: &Path) -> BackupResult<()>;

    /// Decrypt `input` into `output`; a wrong passphrase is an error
    fn decrypt(&self, input: &Path, output: &Path) -> BackupResult<()>;
}

/// `gpg` command-line encryption gate
pub struct GpgGate {
    program: String,
    passphrase: SecureString,
}

impl GpgGate {
    pub fn new(passphrase: SecureString) -> Self {
        Self {
            program: "gpg".to_string(),
            passphrase,
        }
    }

    /// Use a different gpg binary (e.g. `gpg2`)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn run(&self, mode: &str, input: &Path, output: &Path) -> BackupResult<()> {
        let mut child = Command::new(&self.program)
            .args([
                "--batch",
                "--yes",
                "--quiet",
                "--pinentry-mode",
                "loopback",
                "--passphrase-fd",
                "0",
            ])
            .arg(mode)
            .arg("--output")
            .arg(output)
            .arg(input)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BackupError::Encryption(format!("Failed to start {}: {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(self.passphrase.as_bytes())
                .and_then(|_| stdin.write_all(b"\n"))
                .map_err(|e| {
                    BackupError::Encryption(format!("Failed to pass passphrase to gpg: {}", e))
                })?;
        }

        let result = child
            .wait_with_output()
            .map_err(|e| BackupError::Encryption(format!("gpg did not finish: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(BackupError::Encryption(format!(
                "gpg {} failed ({}): {}",
                mode.trim_start_matches("--"),
                result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl EncryptionGate for GpgGate {
    fn encrypt(&self, input: &Path, output: &Path) -> BackupResult<()> {
        tracing::debug!(input = %input.display(), "Encrypting dump");
        self.run("--symmetric", input, output)
    }

    fn decrypt(&self, input: &Path, output: &Path) -> BackupResult<()> {
        tracing::debug!(input = %input.display(), "Decrypting dump");
        self.run("--decrypt", input, output)
    }
}

impl std::fmt::Debug for GpgGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpgGate")
            .field("program", &self.program)
            .field("passphrase", &self.passphrase)
            .finish()
    }
}
