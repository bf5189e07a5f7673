//! Errors raised while reading a state document.
//!
//! Every variant that concerns a specific key carries the key's name so the
//! operator can find it in the file.

use thiserror::Error;

/// The state document could not be read as either schema version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Not valid JSON.
    #[error("malformed JSON at line {line}, column {column}: {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },

    /// The top-level value is not an object.
    #[error("state document must be a JSON object")]
    NotAnObject,

    /// A mandatory key is absent.
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// A mandatory key holds the wrong kind of value.
    #[error("field {field} has the wrong shape: expected {expected}")]
    WrongShape {
        field: String,
        expected: &'static str,
    },

    /// A side book's runner index points outside its lots.
    #[error("{book}.runner_id {runner_id} is out of range for {lots} lot(s)")]
    RunnerOutOfRange {
        book: &'static str,
        runner_id: i64,
        lots: usize,
    },

    /// Shape checks passed but a nested value failed to decode.
    #[error("invalid state document: {message}")]
    Invalid { message: String },
}

impl SchemaError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn wrong_shape(field: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongShape {
            field: field.into(),
            expected,
        }
    }

    pub(crate) fn from_json(err: &serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            Self::Malformed {
                line: err.line(),
                column: err.column(),
                message: err.to_string(),
            }
        } else {
            Self::Invalid {
                message: err.to_string(),
            }
        }
    }
}
