//! Process supervisor port.
//!
//! The trading process is managed by an external supervisor (a container
//! runtime or an init system). Only two verbs are ever used.

use crate::error::ControllerError;

/// Stops and starts a named long-running service.
///
/// Both calls block until the supervisor answers and are attempted once.
pub trait ServiceController {
    /// Stop `service`. An error means the process may still be running.
    fn stop(&self, service: &str) -> Result<(), ControllerError>;

    /// Start `service`.
    fn start(&self, service: &str) -> Result<(), ControllerError>;
}

impl<T: ServiceController + ?Sized> ServiceController for &T {
    fn stop(&self, service: &str) -> Result<(), ControllerError> {
        (**self).stop(service)
    }

    fn start(&self, service: &str) -> Result<(), ControllerError> {
        (**self).start(service)
    }
}
