//! Reading metrics and documents from a live state file.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::atomic::AtomicFile;
use crate::domain::document::{self, StateDocument};
use crate::domain::SchemaError;
use crate::error::{Error, Result};
use crate::port::MetricSource;

/// A [`MetricSource`] that re-reads the state file on every call.
///
/// The trading process may be rewriting the file while it is read, so a
/// parse failure here is an ordinary error the watcher retries past.
#[derive(Debug, Clone)]
pub struct StateFileMetric {
    path: PathBuf,
}

impl StateFileMetric {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricSource for StateFileMetric {
    fn read_metric(&self, metric: &str) -> Result<Option<f64>> {
        let value = read_value(&self.path)?;
        Ok(document::read_metric(&value, metric))
    }
}

/// Read `metric` once, failing if the file or the metric is missing.
pub fn read_baseline(path: &Path, metric: &str) -> Result<f64> {
    let value = read_value(path)?;
    document::read_metric(&value, metric).ok_or_else(|| Error::MissingMetric {
        metric: metric.to_string(),
        path: path.to_path_buf(),
    })
}

/// Read and parse a whole state document.
pub fn read_document(path: &Path) -> Result<StateDocument> {
    let bytes = AtomicFile::new(path).read()?;
    Ok(StateDocument::parse(&bytes)?)
}

fn read_value(path: &Path) -> Result<Value> {
    let bytes = AtomicFile::new(path).read()?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Schema(SchemaError::from_json(&e)))
}
