//! Configuration loading and validation.

pub mod accounts;
pub mod logging;
pub mod settings;

pub use accounts::AccountConfig;
pub use logging::LoggingConfig;
pub use settings::{Config, ControllerConfig, WatchConfig};
