//! Outbound ports.

pub mod controller;
pub mod metric;
