//! State file persistence.

pub mod atomic;
pub mod state_file;

pub use atomic::{AtomicFile, BackupPolicy, Mutation, StagedWrite};
pub use state_file::{read_baseline, read_document, StateFileMetric};
