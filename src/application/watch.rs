//! Blocking poll of a metric until it lands in a target band.

use std::thread;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::port::MetricSource;

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Inclusive band `[target - tolerance, target + tolerance]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBand {
    pub low: Decimal,
    pub high: Decimal,
}

impl TargetBand {
    /// Band around `baseline + delta`, widened by `tolerance` either way.
    ///
    /// Returns `None` when either edge overflows `Decimal`.
    #[must_use]
    pub fn around(baseline: Decimal, delta: Decimal, tolerance: Decimal) -> Option<Self> {
        let target = baseline.checked_add(delta)?;
        let tolerance = tolerance.abs();
        Some(Self {
            low: target.checked_sub(tolerance)?,
            high: target.checked_add(tolerance)?,
        })
    }

    #[must_use]
    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.low && value <= self.high
    }
}

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    TargetMet {
        observed: Decimal,
        elapsed: Duration,
        polls: u32,
    },
    Timeout {
        last_observed: Option<Decimal>,
        elapsed: Duration,
        polls: u32,
    },
}

/// Polls a [`MetricSource`] at a fixed interval.
pub struct Watcher<S> {
    source: S,
    interval: Duration,
}

impl<S: MetricSource> Watcher<S> {
    #[must_use]
    pub fn new(source: S, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Poll until `metric` is inside `band`, or `timeout` passes.
    ///
    /// A zero `timeout` polls forever. Snapshots without a usable value count
    /// as "not yet met". `on_poll` sees every observation, including misses.
    pub fn wait_for(
        &self,
        metric: &str,
        band: TargetBand,
        timeout: Duration,
        mut on_poll: impl FnMut(Option<Decimal>),
    ) -> WatchOutcome {
        let started = Instant::now();
        let mut polls: u32 = 0;
        let mut last_observed = None;

        loop {
            polls = polls.saturating_add(1);
            let observed = self.observe(metric);
            on_poll(observed);

            if let Some(value) = observed {
                last_observed = Some(value);
                if band.contains(value) {
                    debug!(metric, %value, polls, "target band reached");
                    return WatchOutcome::TargetMet {
                        observed: value,
                        elapsed: started.elapsed(),
                        polls,
                    };
                }
            }

            let elapsed = started.elapsed();
            let pause = if timeout.is_zero() {
                self.interval
            } else if elapsed >= timeout {
                debug!(metric, polls, "watch timed out");
                return WatchOutcome::Timeout {
                    last_observed,
                    elapsed,
                    polls,
                };
            } else {
                self.interval.min(timeout - elapsed)
            };
            thread::sleep(pause);
        }
    }

    fn observe(&self, metric: &str) -> Option<Decimal> {
        match self.source.read_metric(metric) {
            Ok(Some(raw)) => Decimal::try_from(raw).ok(),
            Ok(None) => {
                trace!(metric, "metric not present yet");
                None
            }
            Err(err) => {
                debug!(metric, error = %err, "metric read failed, retrying next poll");
                None
            }
        }
    }
}
