//! Per-side book of open lots.

use serde::{Deserialize, Serialize};

use super::error::SchemaError;
use super::position::Position;

/// Runner index meaning "no designated runner".
pub const NO_RUNNER: i64 = -1;

fn no_runner() -> i64 {
    NO_RUNNER
}

/// Open lots for one side, oldest first, plus the runner designation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideBook {
    #[serde(default = "no_runner")]
    pub runner_id: i64,
    pub lots: Vec<Position>,
}

impl SideBook {
    /// An empty book with no runner.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            runner_id: NO_RUNNER,
            lots: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// The runner lot, if one is designated.
    #[must_use]
    pub fn runner(&self) -> Option<&Position> {
        usize::try_from(self.runner_id)
            .ok()
            .and_then(|idx| self.lots.get(idx))
    }

    /// Check the runner index is -1 or a valid index into `lots`.
    pub fn validate(&self, book: &'static str) -> Result<(), SchemaError> {
        let in_range = self.runner_id == NO_RUNNER || self.runner().is_some();
        if in_range {
            Ok(())
        } else {
            Err(SchemaError::RunnerOutOfRange {
                book,
                runner_id: self.runner_id,
                lots: self.lots.len(),
            })
        }
    }
}

impl Default for SideBook {
    fn default() -> Self {
        Self::empty()
    }
}
