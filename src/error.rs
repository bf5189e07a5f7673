use std::path::PathBuf;

use thiserror::Error;

use crate::domain::error::SchemaError;

/// Process exit codes, one per error category.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    /// I/O and anything without a more specific category.
    pub const FAILURE: u8 = 1;
    /// Unknown account, bad config file, bad CLI usage.
    pub const CONFIG: u8 = 2;
    /// The process supervisor refused a stop or start.
    pub const CONTROLLER: u8 = 3;
    /// State file missing or unreadable.
    pub const STATE_FILE: u8 = 4;
    /// Required metric or field missing, or the document is malformed.
    pub const MISSING_METRIC: u8 = 5;
    /// Watch timed out before the target band was reached.
    pub const TIMEOUT: u8 = 6;
}

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("unknown account '{name}'")]
    UnknownAccount { name: String, known: Vec<String> },

    #[error("failed to read config file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures talking to the process supervisor.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} {verb} {service} failed ({status}): {stderr}")]
    Failed {
        program: String,
        verb: &'static str,
        service: String,
        status: String,
        stderr: String,
    },
}

/// Failures reading, backing up, or replacing a state file.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("state file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to back up {} to {}: {source}", path.display(), backup.display())]
    Backup {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stage replacement for {}: {source}", path.display())]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to carry ownership over to {}: {source}", path.display())]
    Ownership {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to replace {}: {source}", path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Legacy-to-current migration failures.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("cannot parse legacy state: {0}")]
    Parse(#[from] SchemaError),

    #[error("failed to encode migrated state: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("required metric {metric} missing from {}", path.display())]
    MissingMetric { metric: String, path: PathBuf },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Exit code for the error's category.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) => exit::CONFIG,
            Error::Controller(_) => exit::CONTROLLER,
            Error::Store(StoreError::NotFound { .. } | StoreError::Read { .. }) => exit::STATE_FILE,
            Error::Store(_) => exit::FAILURE,
            Error::Schema(_) | Error::MissingMetric { .. } => exit::MISSING_METRIC,
            Error::Migration(MigrationError::Parse(_)) => exit::MISSING_METRIC,
            Error::Migration(MigrationError::Encode(_)) => exit::FAILURE,
            Error::Json(_) | Error::Io(_) => exit::FAILURE,
        }
    }
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        // dialoguer::Error wraps an IO error
        Error::Io(std::io::Error::other(err.to_string()))
    }
}
