//! Handler for the `inspect` command.

use std::path::PathBuf;

use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::command::InspectArgs;
use super::diagnostic::Failure;
use super::output;
use crate::adapter::outbound::store::read_document;
use crate::domain::{Side, StateDocument, NO_RUNNER};
use crate::error::{exit, ConfigError};
use crate::infrastructure::config::Config;

#[derive(Tabled)]
struct BookRow {
    #[tabled(rename = "Side")]
    side: Side,
    #[tabled(rename = "Lots")]
    lots: usize,
    #[tabled(rename = "Runner")]
    runner: String,
    #[tabled(rename = "LastAddEquity")]
    allocation: String,
}

/// Per-side summary that both schema versions can fill in.
struct SideSummary {
    side: Side,
    lots: usize,
    runner: Option<i64>,
    allocation: Option<f64>,
}

fn summarize(document: &StateDocument) -> Vec<SideSummary> {
    Side::ALL
        .into_iter()
        .map(|side| match document {
            StateDocument::Legacy(state) => SideSummary {
                side,
                lots: state.lot_count(side),
                runner: None,
                allocation: match side {
                    Side::Buy => state.last_add_equity_buy,
                    Side::Sell => state.last_add_equity_sell,
                },
            },
            StateDocument::Current(state) => SideSummary {
                side,
                lots: state.lot_count(side),
                runner: Some(state.book(side).runner_id),
                allocation: Some(state.last_add_equity(side)),
            },
        })
        .collect()
}

/// Lots in a legacy document whose side is neither BUY nor SELL.
fn unrecognized_lots(document: &StateDocument) -> usize {
    match document {
        StateDocument::Legacy(state) => {
            let present = state.lots.iter().flatten().count();
            present - state.lot_count(Side::Buy) - state.lot_count(Side::Sell)
        }
        StateDocument::Current(_) => 0,
    }
}

fn runner_label(runner: Option<i64>) -> String {
    match runner {
        None => "-".to_string(),
        Some(NO_RUNNER) => "none".to_string(),
        Some(index) => index.to_string(),
    }
}

/// Execute the inspect command.
pub fn execute(config: &Config, args: &InspectArgs) -> Result<u8, Failure> {
    let path: PathBuf = match (&args.state, &args.account) {
        (Some(path), _) => path.clone(),
        (None, Some(account)) => config.account(account)?.state_file.clone(),
        (None, None) => {
            return Err(ConfigError::MissingField {
                field: "account or --state",
            }
            .into())
        }
    };

    let document = read_document(&path).map_err(|err| Failure::at(&path, err))?;
    let sides = summarize(&document);
    let unrecognized = unrecognized_lots(&document);

    if output::is_json() {
        let sides: Vec<_> = sides
            .iter()
            .map(|s| {
                json!({
                    "side": s.side,
                    "lots": s.lots,
                    "runner_id": s.runner,
                    "last_add_equity": s.allocation,
                })
            })
            .collect();
        output::summary(json!({
            "command": "inspect",
            "path": path,
            "schema": document.version().to_string(),
            "equity_usd": document.equity_usd(),
            "unrecognized_lots": unrecognized,
            "sides": sides,
        }));
        return Ok(exit::SUCCESS);
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("State file", path.display());
    output::field("Schema", output::highlight(document.version()));
    output::field("Equity", document.equity_usd());

    let rows: Vec<BookRow> = sides
        .iter()
        .map(|s| BookRow {
            side: s.side,
            lots: s.lots,
            runner: runner_label(s.runner),
            allocation: s
                .allocation
                .map_or_else(|| "-".to_string(), |v| v.to_string()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!();
    output::lines(&table.to_string());

    if unrecognized > 0 {
        output::warning(&format!(
            "{unrecognized} legacy lot(s) with an unrecognized side; migrate drops them unless --unknown-side is given"
        ));
    }
    if matches!(document, StateDocument::Legacy(_)) {
        output::hint("convert with `botctl migrate --in <file> --inplace`");
    }
    Ok(exit::SUCCESS)
}
