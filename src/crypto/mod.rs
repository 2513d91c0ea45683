//! Encryption for pgbackup
//!
//! Provides the encryption gate used to protect dumps at rest and the
//! zeroizing string type that carries secrets from configuration.

pub mod gpg;
pub mod secure_memory;

pub use gpg::{EncryptionGate, GpgGate};
pub use secure_memory::SecureString;
