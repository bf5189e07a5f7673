//! Capital injection against a recording supervisor.

mod harness;
mod support;

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use botctl::application::guard::{Fingerprint, GuardVerdict};
use botctl::application::injection::{resume_decision, ResumeDecision, SilentObserver};
use botctl::application::{
    CapitalInjection, InjectionObserver, InjectionOutcome, InjectionRequest, RestartPolicy,
    TargetBand,
};
use botctl::domain::Side;
use botctl::error::{exit, ConfigError, ControllerError, Error};
use harness::recording_controller::RecordingController;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use support::{current_state, other_files, read_json, write_file};

const POLL: Duration = Duration::from_millis(5);

fn request(path: &Path, restart: RestartPolicy, timeout: Duration) -> InjectionRequest {
    InjectionRequest {
        service: "bot-testbot".into(),
        state_file: path.to_path_buf(),
        amount: dec!(50),
        tolerance: dec!(1),
        timeout,
        metric: "EquityUSD".into(),
        restart,
    }
}

/// Rewrite the state with a new equity after `delay`, like the trading
/// process would once the deposit settles.
fn deposit_later(path: &Path, equity: f64, delay: Duration) -> thread::JoinHandle<()> {
    let path = path.to_path_buf();
    thread::spawn(move || {
        thread::sleep(delay);
        fs::write(&path, current_state(equity, 2, 1)).expect("rewrite state");
    })
}

#[test]
fn deposit_raises_both_allocation_fields_and_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "state.json", &current_state(1000.0, 2, 1));
    let controller = RecordingController::new();
    let writer = deposit_later(&path, 1050.2, Duration::from_millis(30));

    let report = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .run(
            &request(&path, RestartPolicy::Always, Duration::from_secs(10)),
            &mut SilentObserver,
        )
        .unwrap();
    writer.join().unwrap();

    assert_eq!(report.baseline, dec!(1000));
    assert_eq!(report.band, TargetBand { low: dec!(1049), high: dec!(1051) });
    let InjectionOutcome::Applied { backup, before, after, restarted } = report.outcome else {
        panic!("expected applied outcome");
    };
    assert!(restarted);
    assert_eq!(before, Fingerprint { buy: 2, sell: 1 });
    assert_eq!(after, before);
    assert_eq!(controller.calls(), vec!["stop bot-testbot", "start bot-testbot"]);

    let state = read_json(&path);
    assert_eq!(state["LastAddEquityBuy"], serde_json::json!(250.0));
    assert_eq!(state["LastAddEquitySell"], serde_json::json!(50.0));
    assert_eq!(state["EquityUSD"], serde_json::json!(1050.2));
    assert_eq!(state["Model"], serde_json::json!({"weights": [1, 2, 3]}));

    let backup = backup.expect("timestamped backup");
    let saved = read_json(&backup);
    assert_eq!(saved["LastAddEquityBuy"], serde_json::json!(200));
    assert!(saved.get("LastAddEquitySell").is_none());
}

#[test]
fn timeout_stops_nothing_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let content = current_state(1000.0, 1, 1);
    let path = write_file(dir.path(), "state.json", &content);
    let controller = RecordingController::new();

    let report = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .run(
            &request(&path, RestartPolicy::Always, Duration::from_millis(50)),
            &mut SilentObserver,
        )
        .unwrap();

    match report.outcome {
        InjectionOutcome::TimedOut { last_observed, .. } => {
            assert_eq!(last_observed, Some(dec!(1000)));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(controller.calls().is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
    assert!(other_files(dir.path(), &["state.json"]).is_empty());
}

#[test]
fn failed_stop_aborts_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let content = current_state(1000.0, 1, 0);
    let path = write_file(dir.path(), "state.json", &content);
    let controller = RecordingController::failing_stop();
    let writer = deposit_later(&path, 1050.0, Duration::from_millis(10));

    let err = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .run(
            &request(&path, RestartPolicy::Always, Duration::from_secs(10)),
            &mut SilentObserver,
        )
        .unwrap_err();
    writer.join().unwrap();

    assert!(matches!(err, Error::Controller(ControllerError::Failed { verb: "stop", .. })));
    assert_eq!(err.exit_code(), exit::CONTROLLER);
    assert_eq!(controller.calls(), vec!["stop bot-testbot"]);
    assert!(read_json(&path).get("LastAddEquitySell").is_none());
    assert!(other_files(dir.path(), &["state.json"]).is_empty());
}

#[test]
fn no_restart_leaves_service_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "state.json", &current_state(1000.0, 1, 1));
    let controller = RecordingController::new();
    let mut request = request(&path, RestartPolicy::Never, Duration::from_secs(10));
    request.tolerance = dec!(100);

    let report = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .run(&request, &mut SilentObserver)
        .unwrap();

    assert!(matches!(report.outcome, InjectionOutcome::Applied { restarted: false, .. }));
    assert_eq!(controller.calls(), vec!["stop bot-testbot"]);
}

#[derive(Default)]
struct ConfirmingObserver {
    polls: usize,
    met: Option<Decimal>,
    stopped: Vec<String>,
    asked: Vec<String>,
}

impl InjectionObserver for ConfirmingObserver {
    fn on_poll(&mut self, _observed: Option<Decimal>, _band: &TargetBand) {
        self.polls += 1;
    }

    fn on_target_met(&mut self, observed: Decimal) {
        self.met = Some(observed);
    }

    fn on_stopped(&mut self, service: &str) {
        self.stopped.push(service.to_string());
    }

    fn confirm_restart(&mut self, service: &str) -> botctl::error::Result<bool> {
        self.asked.push(service.to_string());
        Ok(true)
    }
}

#[test]
fn confirm_policy_asks_the_operator() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "state.json", &current_state(1000.0, 1, 1));
    let controller = RecordingController::new();
    let mut request = request(&path, RestartPolicy::Confirm, Duration::from_secs(10));
    request.tolerance = dec!(100);
    let mut observer = ConfirmingObserver::default();

    let report = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .run(&request, &mut observer)
        .unwrap();

    assert!(matches!(report.outcome, InjectionOutcome::Applied { restarted: true, .. }));
    assert_eq!(observer.polls, 1);
    assert_eq!(observer.met, Some(dec!(1000)));
    assert_eq!(observer.stopped, vec!["bot-testbot"]);
    assert_eq!(observer.asked, vec!["bot-testbot"]);
    assert_eq!(controller.calls(), vec!["stop bot-testbot", "start bot-testbot"]);
}

#[test]
fn missing_metric_fails_before_stopping() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "state.json", r#"{"Lots": []}"#);
    let controller = RecordingController::new();

    let err = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .run(
            &request(&path, RestartPolicy::Always, Duration::from_secs(1)),
            &mut SilentObserver,
        )
        .unwrap_err();

    assert!(matches!(err, Error::MissingMetric { .. }));
    assert_eq!(err.exit_code(), exit::MISSING_METRIC);
    assert!(controller.calls().is_empty());
}

#[test]
fn zero_amount_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "state.json", &current_state(1000.0, 1, 1));
    let controller = RecordingController::new();
    let mut request = request(&path, RestartPolicy::Always, Duration::from_secs(1));
    request.amount = Decimal::ZERO;

    let err = CapitalInjection::new(&controller)
        .run(&request, &mut SilentObserver)
        .unwrap_err();

    assert!(matches!(err, Error::Config(ConfigError::InvalidValue { field: "amount", .. })));
    assert!(controller.calls().is_empty());
}

#[test]
fn failed_restart_is_reported_after_the_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "state.json", &current_state(1000.0, 1, 1));
    let controller = RecordingController::failing_start();
    let mut request = request(&path, RestartPolicy::Always, Duration::from_secs(1));
    request.tolerance = dec!(100);

    let err = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .run(&request, &mut SilentObserver)
        .unwrap_err();

    assert_eq!(err.exit_code(), exit::CONTROLLER);
    assert_eq!(read_json(&path)["LastAddEquitySell"], serde_json::json!(50.0));
}

#[test]
fn wiped_side_vetoes_restart_whatever_the_policy() {
    let verdict = botctl::application::guard::check(
        Fingerprint { buy: 3, sell: 1 },
        Fingerprint { buy: 0, sell: 1 },
    );
    assert_eq!(verdict, GuardVerdict::Unsafe { wiped: vec![Side::Buy] });
    for policy in [RestartPolicy::Always, RestartPolicy::Confirm] {
        assert_eq!(resume_decision(&verdict, policy), ResumeDecision::LeaveStopped);
    }
}

/// Raises capital but drops every BUY lot, the way a bad rewrite would.
fn wipe_buy_book(bytes: &[u8], amount: Decimal) -> botctl::error::Result<Vec<u8>> {
    let raised = botctl::application::injection::add_capital(bytes, amount)?;
    let mut state: serde_json::Value = serde_json::from_slice(&raised)?;
    state["BookBuy"] = serde_json::json!({"runner_id": -1, "lots": []});
    Ok(serde_json::to_vec_pretty(&state)?)
}

#[test]
fn wiped_book_leaves_service_stopped_with_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "state.json", &current_state(1000.0, 2, 1));
    let controller = RecordingController::new();
    let mut request = request(&path, RestartPolicy::Always, Duration::from_secs(1));
    request.tolerance = dec!(100);

    let report = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .with_edit(wipe_buy_book)
        .run(&request, &mut SilentObserver)
        .unwrap();

    let InjectionOutcome::Vetoed { backup, before, after, wiped } = report.outcome else {
        panic!("expected vetoed outcome, got {:?}", report.outcome);
    };
    assert_eq!(wiped, vec![Side::Buy]);
    assert_eq!(before, Fingerprint { buy: 2, sell: 1 });
    assert_eq!(after, Fingerprint { buy: 0, sell: 1 });
    assert_eq!(controller.calls(), vec!["stop bot-testbot"]);

    let backup = backup.expect("timestamped backup");
    assert_eq!(fs::read_to_string(backup).unwrap(), current_state(1000.0, 2, 1));
}

#[test]
fn overflowing_amount_fails_before_stopping() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "state.json", &current_state(1000.0, 1, 1));
    let controller = RecordingController::new();
    let mut request = request(&path, RestartPolicy::Always, Duration::from_secs(1));
    request.amount = Decimal::MAX;

    let err = CapitalInjection::new(&controller)
        .with_poll_interval(POLL)
        .run(&request, &mut SilentObserver)
        .unwrap_err();

    assert!(matches!(err, Error::Config(ConfigError::InvalidValue { field: "amount", .. })));
    assert_eq!(err.exit_code(), exit::CONFIG);
    assert!(controller.calls().is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), current_state(1000.0, 1, 1));
}
