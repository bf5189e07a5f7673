//! Handler for the `migrate` command.

use std::io;

use serde_json::json;

use super::command::MigrateArgs;
use super::diagnostic::Failure;
use super::output;
use crate::adapter::outbound::store::{AtomicFile, BackupPolicy};
use crate::application::migration::{migrate_bytes, MigrationOutcome, MigrationReport};
use crate::application::UnknownSidePolicy;
use crate::domain::document::to_pretty_bytes;
use crate::error::{exit, ConfigError, Error, MigrationError};

/// Execute the migrate command.
pub fn execute(args: &MigrateArgs) -> Result<u8, Failure> {
    let input = AtomicFile::new(&args.input);
    let policy = UnknownSidePolicy::from(args.unknown_side);

    let original = input.read().map_err(|err| Failure::at(&args.input, err))?;
    let outcome = migrate_bytes(&original, policy).map_err(|err| Failure::at(&args.input, err))?;

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Input", args.input.display());

    let (state, report) = match outcome {
        MigrationOutcome::AlreadyCurrent => {
            output::success("Already on per-side books; nothing to do");
            output::summary(json!({
                "command": "migrate",
                "status": "already_current",
                "input": args.input,
            }));
            return Ok(exit::SUCCESS);
        }
        MigrationOutcome::Migrated { state, report } => (state, report),
    };

    let rendered = to_pretty_bytes(state.as_ref()).map_err(MigrationError::Encode)?;

    let (written, backup) = if args.inplace {
        let mutation = input
            .mutate(BackupPolicy::Sibling, |current| {
                if current != original.as_slice() {
                    return Err(Error::Io(io::Error::other(
                        "file changed while migrating; stop its owner and retry",
                    )));
                }
                Ok(rendered)
            })
            .map_err(|err| Failure::at(&args.input, err))?;
        (args.input.clone(), mutation.backup)
    } else {
        let out = args
            .out
            .as_ref()
            .ok_or(ConfigError::MissingField { field: "--out" })?;
        AtomicFile::new(out).write(&rendered)?;
        (out.clone(), None)
    };

    render(&report);
    output::field("Output", written.display());
    if let Some(backup) = &backup {
        output::field("Backup", backup.display());
    }
    output::success(&format!("Migrated {} lot(s)", report.migrated_lots()));

    let dropped: Vec<_> = report
        .dropped
        .iter()
        .map(|lot| json!({ "index": lot.index, "side": lot.side }))
        .collect();
    output::summary(json!({
        "command": "migrate",
        "status": "migrated",
        "input": args.input,
        "output": written,
        "backup": backup,
        "buy_lots": report.buy_lots,
        "sell_lots": report.sell_lots,
        "routed": report.routed,
        "dropped": dropped,
        "null_entries": report.null_entries,
        "seeded_trails": report.seeded_trails,
        "dropped_fields": report.dropped_fields,
    }));
    Ok(exit::SUCCESS)
}

fn render(report: &MigrationReport) {
    output::section("Books");
    output::field("Buy lots", report.buy_lots);
    output::field("Sell lots", report.sell_lots);
    if report.seeded_trails > 0 {
        output::field("Seeded trails", report.seeded_trails);
    }
    if report.routed > 0 {
        output::field("Routed", report.routed);
    }
    if report.null_entries > 0 {
        output::field("Null entries", report.null_entries);
    }
    for lot in &report.dropped {
        output::warning(&format!(
            "dropped lot #{} with unrecognized side {:?}",
            lot.index, lot.side
        ));
    }
    if !report.dropped.is_empty() {
        output::hint("use --unknown-side buy|sell to keep them");
    }
    if !report.dropped_fields.is_empty() {
        output::warning(&format!(
            "fields with no place in the new schema: {}",
            report.dropped_fields.join(", ")
        ));
    }
}
