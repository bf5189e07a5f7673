use std::sync::{Arc, Mutex};

use botctl::error::ControllerError;
use botctl::port::ServiceController;

/// Supervisor stand-in that records every request.
#[derive(Clone, Default)]
pub struct RecordingController {
    calls: Arc<Mutex<Vec<String>>>,
    fail_stop: bool,
    fail_start: bool,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    /// Requests so far, as `"<verb> <service>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock controller calls").clone()
    }

    fn record(&self, verb: &'static str, service: &str, fail: bool) -> Result<(), ControllerError> {
        self.calls
            .lock()
            .expect("lock controller calls")
            .push(format!("{verb} {service}"));
        if fail {
            return Err(ControllerError::Failed {
                program: "recording".into(),
                verb,
                service: service.to_string(),
                status: "exit status: 1".into(),
                stderr: "refused".into(),
            });
        }
        Ok(())
    }
}

impl ServiceController for RecordingController {
    fn stop(&self, service: &str) -> Result<(), ControllerError> {
        self.record("stop", service, self.fail_stop)
    }

    fn start(&self, service: &str) -> Result<(), ControllerError> {
        self.record("start", service, self.fail_start)
    }
}
