//! Logging configuration and initialization.

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Level after applying `-v` repetitions: one raises to debug, two or
    /// more to trace.
    #[must_use]
    pub fn effective_level(&self, verbose: u8) -> &str {
        match verbose {
            0 => &self.level,
            1 => "debug",
            _ => "trace",
        }
    }

    /// Initialize the tracing subscriber. Output goes to stderr.
    ///
    /// `RUST_LOG` wins over the configured level. A second call is a no-op.
    pub fn init(&self, verbose: u8) {
        let level = self.effective_level(verbose);
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let result = match self.format.as_str() {
            "json" => fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        // Already initialized by an earlier call or a test harness.
        let _ = result;
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "pretty".into(),
        }
    }
}
