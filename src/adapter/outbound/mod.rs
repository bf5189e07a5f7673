//! Outbound adapters (driven side).

pub mod store;
pub mod supervisor;
