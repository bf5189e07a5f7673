//! Infrastructure layer: configuration and logging setup.

pub mod config;
