//! Trait definitions (hexagonal ports).
//!
//! # Available Ports
//!
//! - [`ServiceController`] - Stop/start the process that owns a state file
//! - [`MetricSource`] - Poll a numeric metric out of a state snapshot

pub mod outbound;

pub use outbound::controller::ServiceController;
pub use outbound::metric::MetricSource;
