//! Handler for the `inject` command.

use std::io::IsTerminal;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use indicatif::ProgressBar;
use rust_decimal::Decimal;
use serde_json::json;

use super::command::InjectArgs;
use super::diagnostic::Failure;
use super::output;
use crate::application::guard::Fingerprint;
use crate::application::injection::ALLOCATION_FIELDS;
use crate::application::{
    CapitalInjection, InjectionObserver, InjectionOutcome, InjectionReport, InjectionRequest,
    RestartPolicy, TargetBand,
};
use crate::error::{exit, Error, Result};
use crate::infrastructure::config::Config;

/// Execute the inject command.
pub fn execute(config: &Config, args: &InjectArgs) -> std::result::Result<u8, Failure> {
    let account = config.account(&args.account)?;
    let state_file = args
        .state_file
        .clone()
        .unwrap_or_else(|| account.state_file.clone());

    let restart = if args.yes {
        RestartPolicy::Always
    } else if args.no_restart {
        RestartPolicy::Never
    } else {
        RestartPolicy::Confirm
    };

    let request = InjectionRequest {
        service: account.service.clone(),
        state_file: state_file.clone(),
        amount: args.amount,
        tolerance: args.tolerance.unwrap_or(config.watch.tolerance),
        timeout: args
            .timeout
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| config.watch.timeout()),
        metric: args.metric.clone(),
        restart,
    };

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Account", &args.account);
    output::field("Service", &request.service);
    output::field("State file", state_file.display());
    output::field("Amount", request.amount);
    output::warning(
        "Stopping the service is the only thing keeping other writers off the state file; \
         make sure nothing else touches it until this finishes.",
    );

    let controller = config.controller.controller();
    let program = controller.program().to_string();
    let injection = CapitalInjection::new(controller).with_poll_interval(config.watch.interval());
    let mut observer = TerminalObserver::new(&request.metric);

    let report = injection
        .run(&request, &mut observer)
        .map_err(|err| Failure::at(&state_file, err))?;

    let code = render(&request, &report, &program, &mut observer);
    Ok(code)
}

fn render(
    request: &InjectionRequest,
    report: &InjectionReport,
    program: &str,
    observer: &mut TerminalObserver,
) -> u8 {
    let band = json!({ "low": report.band.low, "high": report.band.high });

    match &report.outcome {
        InjectionOutcome::TimedOut {
            last_observed,
            elapsed,
        } => {
            let last = last_observed.map_or_else(|| "nothing".to_string(), |v| v.to_string());
            observer.fail(&format!(
                "{} did not reach [{}, {}] within {}s (last seen: {last})",
                request.metric,
                report.band.low,
                report.band.high,
                elapsed.as_secs()
            ));
            output::hint("nothing was stopped or written; rerun once the deposit settles");
            output::summary(json!({
                "command": "inject",
                "status": "timeout",
                "service": request.service,
                "baseline": report.baseline,
                "band": band,
                "last_observed": last_observed,
            }));
            exit::TIMEOUT
        }
        InjectionOutcome::Applied {
            backup,
            before,
            after,
            restarted,
        } => {
            output::success(&format!(
                "Raised {} by {}",
                ALLOCATION_FIELDS.join(" and "),
                output::highlight(request.amount)
            ));
            if let Some(backup) = backup {
                output::field("Backup", backup.display());
            }
            output::field("Lots", lots_change(before, after));
            if *restarted {
                output::success(&format!("Restarted {}", request.service));
            } else {
                output::warning(&format!("{} left stopped", request.service));
                output::hint(&format!("start it with `{program} start {}`", request.service));
            }
            output::summary(json!({
                "command": "inject",
                "status": "applied",
                "service": request.service,
                "baseline": report.baseline,
                "band": band,
                "backup": backup,
                "before": before,
                "after": after,
                "restarted": restarted,
            }));
            exit::SUCCESS
        }
        InjectionOutcome::Vetoed {
            backup,
            before,
            after,
            wiped,
        } => {
            let sides: Vec<String> = wiped.iter().map(ToString::to_string).collect();
            output::error(&format!(
                "{} side lost every lot ({}); {} left stopped",
                sides.join(" and "),
                lots_change(before, after),
                request.service
            ));
            if let Some(backup) = backup {
                output::field("Backup", backup.display());
                output::hint(&format!(
                    "compare with `botctl compare {} {}` before restoring or restarting",
                    backup.display(),
                    request.state_file.display()
                ));
            }
            output::summary(json!({
                "command": "inject",
                "status": "vetoed",
                "service": request.service,
                "baseline": report.baseline,
                "band": band,
                "backup": backup,
                "before": before,
                "after": after,
                "wiped": sides,
            }));
            exit::SUCCESS
        }
    }
}

fn lots_change(before: &Fingerprint, after: &Fingerprint) -> String {
    format!("{before} → {after}")
}

/// Spinner while polling, prompt before restart.
struct TerminalObserver {
    metric: String,
    spinner: Option<ProgressBar>,
}

impl TerminalObserver {
    fn new(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
            spinner: None,
        }
    }

    fn fail(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => output::spinner_fail(&spinner, message),
            None => output::error(message),
        }
    }
}

impl InjectionObserver for TerminalObserver {
    fn on_poll(&mut self, observed: Option<Decimal>, band: &TargetBand) {
        let metric = &self.metric;
        let spinner = self
            .spinner
            .get_or_insert_with(|| output::spinner(&format!("Waiting for {metric}")));
        let seen = observed.map_or_else(|| "-".to_string(), |v| v.to_string());
        spinner.set_message(format!(
            "Waiting for {metric} in [{}, {}], now {}",
            band.low,
            band.high,
            output::muted(seen)
        ));
    }

    fn on_target_met(&mut self, observed: Decimal) {
        let message = format!("{} reached {observed}", self.metric);
        match self.spinner.take() {
            Some(spinner) => output::spinner_success(&spinner, &message),
            None => output::success(&message),
        }
    }

    fn on_stopped(&mut self, service: &str) {
        output::success(&format!("Stopped {service}"));
    }

    fn confirm_restart(&mut self, service: &str) -> Result<bool> {
        if output::is_json() || !std::io::stdin().is_terminal() {
            output::warning("not interactive; pass --yes to restart automatically");
            return Ok(false);
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Restart {service}?"))
            .default(true)
            .interact()
            .map_err(Error::from)
    }
}
