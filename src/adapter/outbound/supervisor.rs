//! [`ServiceController`] backed by a supervisor command line.
//!
//! Both supported supervisors take the same shape of invocation,
//! `<program> stop <service>` and `<program> start <service>`, so one
//! adapter covers them and the program can be overridden for wrappers.

use std::process::Command;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ControllerError;
use crate::port::ServiceController;

/// Which supervisor manages the trading processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorKind {
    #[default]
    Docker,
    Systemd,
}

impl SupervisorKind {
    /// Program invoked for this supervisor.
    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            SupervisorKind::Docker => "docker",
            SupervisorKind::Systemd => "systemctl",
        }
    }
}

/// Runs the supervisor once per verb and waits for it.
#[derive(Debug, Clone)]
pub struct SupervisorController {
    program: String,
}

impl SupervisorController {
    #[must_use]
    pub fn new(kind: SupervisorKind) -> Self {
        Self::with_program(kind.program())
    }

    /// Use an explicit program instead of the supervisor's default.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, verb: &'static str, service: &str) -> Result<(), ControllerError> {
        debug!(program = %self.program, verb, service, "invoking supervisor");
        let output = Command::new(&self.program)
            .args([verb, service])
            .output()
            .map_err(|source| ControllerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            info!(service, verb, "supervisor accepted request");
            Ok(())
        } else {
            Err(ControllerError::Failed {
                program: self.program.clone(),
                verb,
                service: service.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl ServiceController for SupervisorController {
    fn stop(&self, service: &str) -> Result<(), ControllerError> {
        self.run("stop", service)
    }

    fn start(&self, service: &str) -> Result<(), ControllerError> {
        self.run("start", service)
    }
}
