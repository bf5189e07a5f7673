//! Miette-based error diagnostics for CLI error presentation.
//!
//! Library errors are plain `thiserror` enums. Here they are turned into
//! miette diagnostics with help text, and a malformed state file is shown
//! with the offending location highlighted.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, SourceSpan};
use thiserror::Error;

use super::command::ColorChoice;
use super::output;
use crate::domain::SchemaError;
use crate::error::{ConfigError, ControllerError, Error, MigrationError, StoreError};

/// A handler error, with the state file it concerns when there is one.
#[derive(Debug)]
pub struct Failure {
    pub error: Error,
    pub state_file: Option<PathBuf>,
}

impl Failure {
    pub fn at(path: &Path, error: impl Into<Error>) -> Self {
        Self {
            error: error.into(),
            state_file: Some(path.to_path_buf()),
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }
}

macro_rules! failure_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for Failure {
                fn from(error: $source) -> Self {
                    Self {
                        error: error.into(),
                        state_file: None,
                    }
                }
            }
        )*
    };
}

failure_from!(
    Error,
    ConfigError,
    ControllerError,
    StoreError,
    SchemaError,
    MigrationError,
    serde_json::Error,
    std::io::Error,
);

/// A state file that failed to parse, with its content.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(botctl::state::malformed))]
pub struct MalformedState {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: SourceSpan,

    #[help]
    pub help: Option<String>,
}

/// Any other failure, with an optional suggestion.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(botctl::error))]
pub struct OperatorError {
    pub message: String,

    #[help]
    pub help: Option<String>,
}

impl OperatorError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Byte offset of a 1-based line and column, clamped to the content.
fn offset_of(content: &str, line: usize, column: usize) -> usize {
    let line_start: usize = content
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(content.len())
}

fn malformed_state(path: &Path, line: usize, column: usize, message: &str) -> Option<MalformedState> {
    let content = std::fs::read_to_string(path).ok()?;
    let offset = offset_of(&content, line, column);
    let len = usize::from(offset < content.len());
    Some(MalformedState {
        message: format!("{} is not valid JSON", path.display()),
        src: NamedSource::new(path.display().to_string(), content),
        span: (offset, len).into(),
        help: Some(format!(
            "{message}; the owning process may have been mid-write, or the file is damaged"
        )),
    })
}

/// Plain diagnostic for an error.
#[must_use]
pub fn describe(error: &Error) -> OperatorError {
    let diagnostic = OperatorError::new(error.to_string());
    match error {
        Error::Config(ConfigError::UnknownAccount { known, .. }) => {
            diagnostic.with_help(format!("known accounts: {}", known.join(", ")))
        }
        Error::Config(_) => {
            diagnostic.with_help("check the config file passed with --config or ~/.botctl/config.toml")
        }
        Error::Store(StoreError::NotFound { .. }) => {
            diagnostic.with_help("pass the state file path explicitly, or fix the account's state_file")
        }
        Error::Store(StoreError::Ownership { .. }) => {
            diagnostic.with_help("run as the file's owner or as root")
        }
        Error::Controller(ControllerError::Spawn { .. }) => {
            diagnostic.with_help("set controller.kind or controller.program in the config")
        }
        Error::Controller(ControllerError::Failed { .. }) => {
            diagnostic.with_help("check the service name and the supervisor's own logs")
        }
        Error::MissingMetric { .. } => {
            diagnostic.with_help("pick another key with --metric, or check the file is a bot state")
        }
        Error::Schema(SchemaError::MissingField { .. } | SchemaError::WrongShape { .. }) => {
            diagnostic.with_help("compare the file against a known good backup")
        }
        _ => diagnostic,
    }
}

fn handler(color: ColorChoice) -> GraphicalReportHandler {
    let colored = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    };
    let theme = if colored {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::unicode_nocolor()
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Print a failure and return its exit code.
pub fn report(failure: &Failure, color: ColorChoice) -> u8 {
    if output::is_json() {
        output::error(&failure.error.to_string());
        return failure.exit_code();
    }

    let malformed = match (&failure.error, &failure.state_file) {
        (Error::Schema(SchemaError::Malformed { line, column, message }), Some(path))
        | (
            Error::Migration(MigrationError::Parse(SchemaError::Malformed {
                line,
                column,
                message,
            })),
            Some(path),
        ) => malformed_state(path, *line, *column, message),
        _ => None,
    };

    let handler = handler(color);
    let mut rendered = String::new();
    let result = match &malformed {
        Some(diagnostic) => handler.render_report(&mut rendered, diagnostic),
        None => handler.render_report(&mut rendered, &describe(&failure.error)),
    };
    if result.is_err() {
        rendered.clear();
        let _ = write!(rendered, "error: {}", failure.error);
    }
    eprintln!("{rendered}");
    failure.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_counts_previous_lines() {
        let content = "{\n  \"EquityUSD\": ,\n}";
        assert_eq!(offset_of(content, 1, 1), 0);
        assert_eq!(offset_of(content, 2, 3), 4);
        assert_eq!(offset_of(content, 9, 9), content.len());
    }

    #[test]
    fn unknown_account_help_lists_accounts() {
        let err = Error::from(ConfigError::UnknownAccount {
            name: "kraken".into(),
            known: vec!["binance".into(), "coinbase".into()],
        });
        let diagnostic = describe(&err);
        assert_eq!(diagnostic.help.as_deref(), Some("known accounts: binance, coinbase"));
    }

    #[test]
    fn malformed_state_points_into_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\n  \"EquityUSD\": ,\n}").unwrap();
        let diagnostic = malformed_state(&path, 2, 16, "expected value").unwrap();
        assert_eq!(diagnostic.span.offset(), 17);
        assert_eq!(diagnostic.span.len(), 1);
    }

    #[test]
    fn failure_keeps_exit_code() {
        let failure = Failure::from(StoreError::NotFound {
            path: PathBuf::from("/nope"),
        });
        assert_eq!(failure.exit_code(), crate::error::exit::STATE_FILE);
        assert!(failure.state_file.is_none());
    }
}
