//! Capital injection: wait for equity to show a deposit, then raise the
//! per-side allocation baselines while the trading process is stopped.
//!
//! The state file has exactly one writer at a time only because the owning
//! process is stopped first. Nothing here locks the file.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use tracing::{error, info, warn};

use super::guard::{self, Fingerprint, GuardVerdict};
use super::watch::{TargetBand, WatchOutcome, Watcher, DEFAULT_POLL_INTERVAL};
use crate::adapter::outbound::store::{
    read_baseline, read_document, AtomicFile, BackupPolicy, StateFileMetric,
};
use crate::domain::document::{to_pretty_bytes, EQUITY_FIELD};
use crate::domain::{RawDocument, SchemaError, Side, StateDocument};
use crate::error::{ConfigError, Error, Result};
use crate::port::ServiceController;

/// Allocation baselines raised by an injection, one per side.
pub const ALLOCATION_FIELDS: [&str; 2] = ["LastAddEquityBuy", "LastAddEquitySell"];

/// Metric watched when none is given.
pub const DEFAULT_METRIC: &str = EQUITY_FIELD;

/// Whether to start the service again after a safe mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    Never,
    Always,
    /// Ask through [`InjectionObserver::confirm_restart`].
    #[default]
    Confirm,
}

/// What to do with the stopped service once the mutation is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    Restart,
    AskOperator,
    LeaveStopped,
}

/// Restart decision for a guard verdict. An unsafe verdict always holds.
#[must_use]
pub fn resume_decision(verdict: &GuardVerdict, policy: RestartPolicy) -> ResumeDecision {
    if !verdict.is_safe() {
        return ResumeDecision::LeaveStopped;
    }
    match policy {
        RestartPolicy::Always => ResumeDecision::Restart,
        RestartPolicy::Confirm => ResumeDecision::AskOperator,
        RestartPolicy::Never => ResumeDecision::LeaveStopped,
    }
}

/// One injection, fully resolved.
#[derive(Debug, Clone)]
pub struct InjectionRequest {
    pub service: String,
    pub state_file: PathBuf,
    pub amount: Decimal,
    pub tolerance: Decimal,
    /// Zero waits forever.
    pub timeout: Duration,
    pub metric: String,
    pub restart: RestartPolicy,
}

/// Progress hooks for the operator surface.
pub trait InjectionObserver {
    fn on_poll(&mut self, _observed: Option<Decimal>, _band: &TargetBand) {}

    fn on_target_met(&mut self, _observed: Decimal) {}

    fn on_stopped(&mut self, _service: &str) {}

    /// Ask whether to start `service` again. Defaults to no.
    fn confirm_restart(&mut self, _service: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Observer that ignores progress and never restarts on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl InjectionObserver for SilentObserver {}

/// How an injection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionOutcome {
    /// The deposit never showed up; nothing was stopped or written.
    TimedOut {
        last_observed: Option<Decimal>,
        elapsed: Duration,
    },
    /// The allocation fields were raised.
    Applied {
        backup: Option<PathBuf>,
        before: Fingerprint,
        after: Fingerprint,
        restarted: bool,
    },
    /// The file was rewritten but a side lost all of its lots, so the
    /// service was left stopped.
    Vetoed {
        backup: Option<PathBuf>,
        before: Fingerprint,
        after: Fingerprint,
        wiped: Vec<Side>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionReport {
    pub baseline: Decimal,
    pub band: TargetBand,
    pub outcome: InjectionOutcome,
}

/// Rewrite applied to the state bytes while the service is stopped.
pub type StateEdit = fn(&[u8], Decimal) -> Result<Vec<u8>>;

/// Runs injections against one supervisor.
pub struct CapitalInjection<C> {
    controller: C,
    poll_interval: Duration,
    edit: StateEdit,
}

impl<C: ServiceController> CapitalInjection<C> {
    #[must_use]
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            poll_interval: DEFAULT_POLL_INTERVAL,
            edit: add_capital,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Swap the state rewrite. Defaults to [`add_capital`].
    #[must_use]
    pub fn with_edit(mut self, edit: StateEdit) -> Self {
        self.edit = edit;
        self
    }

    /// Watch, stop, mutate, verify, and maybe restart.
    ///
    /// Once the service has been stopped, any failure leaves it stopped.
    pub fn run<O: InjectionObserver>(
        &self,
        request: &InjectionRequest,
        observer: &mut O,
    ) -> Result<InjectionReport> {
        if request.amount.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "amount",
                reason: "must not be zero".into(),
            }
            .into());
        }

        let path = request.state_file.as_path();
        let raw_baseline = read_baseline(path, &request.metric)?;
        let baseline = to_decimal(&request.metric, raw_baseline)?;
        let band = TargetBand::around(baseline, request.amount, request.tolerance).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "amount",
                reason: format!("target band around {baseline} overflows"),
            }
        })?;
        info!(
            service = %request.service,
            metric = %request.metric,
            %baseline,
            low = %band.low,
            high = %band.high,
            "waiting for deposit to land"
        );

        let watcher = Watcher::new(StateFileMetric::new(path), self.poll_interval);
        let watched = watcher.wait_for(&request.metric, band, request.timeout, |observed| {
            observer.on_poll(observed, &band);
        });

        match watched {
            WatchOutcome::Timeout {
                last_observed,
                elapsed,
                polls,
            } => {
                warn!(polls, elapsed_ms = elapsed.as_millis() as u64, "deposit not observed before timeout");
                return Ok(InjectionReport {
                    baseline,
                    band,
                    outcome: InjectionOutcome::TimedOut {
                        last_observed,
                        elapsed,
                    },
                });
            }
            WatchOutcome::TargetMet { observed, .. } => observer.on_target_met(observed),
        }

        self.controller.stop(&request.service)?;
        observer.on_stopped(&request.service);

        let outcome = match self.mutate_stopped(request, observer) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    service = %request.service,
                    error = %err,
                    "injection failed after stop; service left stopped"
                );
                return Err(err);
            }
        };

        Ok(InjectionReport {
            baseline,
            band,
            outcome,
        })
    }

    fn mutate_stopped<O: InjectionObserver>(
        &self,
        request: &InjectionRequest,
        observer: &mut O,
    ) -> Result<InjectionOutcome> {
        let path = request.state_file.as_path();

        let mut before = Fingerprint::default();
        let mutation = AtomicFile::new(path).mutate(BackupPolicy::Timestamped, |bytes| {
            before = Fingerprint::of(&StateDocument::parse(bytes)?);
            (self.edit)(bytes, request.amount)
        })?;

        let after = Fingerprint::of(&read_document(path)?);
        let verdict = guard::check(before, after);

        if let GuardVerdict::Unsafe { wiped } = &verdict {
            error!(
                service = %request.service,
                %before,
                %after,
                backup = ?mutation.backup,
                "positions wiped by mutation; not restarting"
            );
            return Ok(InjectionOutcome::Vetoed {
                backup: mutation.backup,
                before,
                after,
                wiped: wiped.clone(),
            });
        }

        let restart = match resume_decision(&verdict, request.restart) {
            ResumeDecision::Restart => true,
            ResumeDecision::AskOperator => observer.confirm_restart(&request.service)?,
            ResumeDecision::LeaveStopped => false,
        };

        if restart {
            self.controller.start(&request.service)?;
        } else {
            info!(service = %request.service, "service left stopped at operator request");
        }

        Ok(InjectionOutcome::Applied {
            backup: mutation.backup,
            before,
            after,
            restarted: restart,
        })
    }
}

/// Add `amount` to both allocation fields, leaving every other key as is.
///
/// An absent or `null` field counts as zero. Only the two allocation values
/// are re-rendered; every other value is copied byte-for-byte.
pub fn add_capital(bytes: &[u8], amount: Decimal) -> Result<Vec<u8>> {
    let mut document = RawDocument::parse(bytes)?;

    for field in ALLOCATION_FIELDS {
        let current = match document.get(field).map(|raw| serde_json::from_str(raw.get())) {
            None | Some(Ok(Value::Null)) => Decimal::ZERO,
            Some(Ok(Value::Number(n))) => {
                let raw = n
                    .as_f64()
                    .ok_or_else(|| SchemaError::wrong_shape(field, "number"))?;
                to_decimal(field, raw)?
            }
            Some(_) => return Err(SchemaError::wrong_shape(field, "number").into()),
        };
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "amount",
                reason: format!("{field} {current} + {amount} overflows"),
            })?;
        let number = updated
            .to_f64()
            .and_then(Number::from_f64)
            .ok_or_else(|| SchemaError::Invalid {
                message: format!("{field} = {updated} is not representable"),
            })?;
        document.set(field, serde_json::value::to_raw_value(&number)?);
    }

    Ok(to_pretty_bytes(&document)?)
}

fn to_decimal(field: &str, raw: f64) -> Result<Decimal> {
    Decimal::try_from(raw).map_err(|_| {
        SchemaError::Invalid {
            message: format!("{field} = {raw} is out of range"),
        }
        .into()
    })
}
