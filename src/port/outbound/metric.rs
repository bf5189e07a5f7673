//! Read-only source of account metrics.

use crate::error::Result;

/// Reads the current value of a named numeric metric.
pub trait MetricSource {
    /// `Ok(None)` when the metric is absent from the current snapshot.
    fn read_metric(&self, metric: &str) -> Result<Option<f64>>;
}
