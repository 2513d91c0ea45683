//! Test helpers: in-memory store, fake collaborators and settings fixtures

pub mod fakes;
pub mod fixtures;
pub mod mock_storage;

pub use fakes::{FakeDumper, FakeGate};
pub use mock_storage::MockStore;
