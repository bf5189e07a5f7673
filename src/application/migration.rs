//! Legacy aggregate-lot state to per-side books.
//!
//! [`migrate`] is pure: it borrows the legacy state and builds a new current
//! state. Writing the result to disk is the caller's job and goes through the
//! atomic store so the original survives until the new file is durable.

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use tracing::{debug, warn};

use crate::domain::document::StateDocument;
use crate::domain::state::LEGACY_FIELDS;
use crate::domain::{
    zero_time, CurrentBotState, LegacyBotState, Position, Side, SideBook, SideToken,
};
use crate::error::MigrationError;

/// What to do with a legacy lot whose side is neither BUY nor SELL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownSidePolicy {
    /// Leave the lot out of both books.
    #[default]
    Drop,
    /// Put the lot in the given side's book.
    Route(Side),
}

/// A legacy lot left out of both books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLot {
    /// Position in the legacy `Lots` list.
    pub index: usize,
    /// The side token as it appeared on disk.
    pub side: String,
}

/// Summary of one migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub buy_lots: usize,
    pub sell_lots: usize,
    /// Lots with an unrecognized side that were dropped.
    pub dropped: Vec<DroppedLot>,
    /// Lots with an unrecognized side that were routed by policy.
    pub routed: usize,
    /// `null` entries in the legacy list.
    pub null_entries: usize,
    /// Runner lots whose trailing peak was seeded from the open price.
    pub seeded_trails: usize,
    /// Top-level keys the current schema has no place for.
    pub dropped_fields: Vec<String>,
}

impl MigrationReport {
    #[must_use]
    pub fn migrated_lots(&self) -> usize {
        self.buy_lots + self.sell_lots
    }
}

/// Result of migrating raw bytes.
#[derive(Debug)]
pub enum MigrationOutcome {
    Migrated {
        state: Box<CurrentBotState>,
        report: MigrationReport,
    },
    /// The input already follows the current schema; nothing to do.
    AlreadyCurrent,
}

/// Migrate a legacy state to the current schema.
#[must_use]
pub fn migrate(
    legacy: &LegacyBotState,
    policy: UnknownSidePolicy,
) -> (CurrentBotState, MigrationReport) {
    let mut report = MigrationReport::default();
    let mut buy_lots: Vec<Position> = Vec::new();
    let mut sell_lots: Vec<Position> = Vec::new();

    for (index, entry) in legacy.lots.iter().enumerate() {
        let Some(lot) = entry else {
            report.null_entries += 1;
            continue;
        };
        let side = match (lot.side_token(), policy) {
            (SideToken::Recognized(side), _) => side,
            (SideToken::Unrecognized(token), UnknownSidePolicy::Route(side)) => {
                debug!(index, token = %token, routed_to = %side, "routing lot with unrecognized side");
                report.routed += 1;
                side
            }
            (SideToken::Unrecognized(token), UnknownSidePolicy::Drop) => {
                warn!(index, token = %token, "dropping lot with unrecognized side");
                report.dropped.push(DroppedLot { index, side: token });
                continue;
            }
        };
        let position = lot.to_position(side);
        match side {
            Side::Buy => buy_lots.push(position),
            Side::Sell => sell_lots.push(position),
        }
    }

    report.buy_lots = buy_lots.len();
    report.sell_lots = sell_lots.len();

    let book_buy = with_default_runner(buy_lots, &mut report);
    let book_sell = with_default_runner(sell_lots, &mut report);

    let state = CurrentBotState {
        equity_usd: legacy.equity_usd,
        daily_start: legacy.daily_start,
        daily_pnl: legacy.daily_pnl,
        model: legacy.model.clone(),
        mdl_ext: legacy.mdl_ext.clone(),
        walk_forward_min: legacy.walk_forward_min,
        last_fit: legacy.last_fit,

        book_buy,
        book_sell,

        last_add_buy: legacy.last_add_buy.unwrap_or_else(zero_time),
        last_add_sell: legacy.last_add_sell.unwrap_or_else(zero_time),
        win_low_buy: legacy.win_low_buy.unwrap_or_default(),
        win_high_sell: legacy.win_high_sell.unwrap_or_default(),
        latched_gate_buy: legacy.latched_gate_buy.unwrap_or_default(),
        latched_gate_sell: legacy.latched_gate_sell.unwrap_or_default(),

        last_add_equity_sell: legacy.last_add_equity_sell.unwrap_or_default(),
        last_add_equity_buy: legacy.last_add_equity_buy.unwrap_or_default(),
        equity_stage_buy: legacy.equity_stage_buy.unwrap_or_default(),
        equity_stage_sell: legacy.equity_stage_sell.unwrap_or_default(),
    };

    (state, report)
}

/// Runner 0 when the book has lots, and the runner's trailing peak seeded.
fn with_default_runner(mut lots: Vec<Position>, report: &mut MigrationReport) -> SideBook {
    let Some(first) = lots.first_mut() else {
        return SideBook::empty();
    };
    if first.seed_trail_peak() {
        report.seeded_trails += 1;
    }
    SideBook { runner_id: 0, lots }
}

/// Parse raw bytes and migrate them.
///
/// Bytes that already parse as a current document come back as
/// [`MigrationOutcome::AlreadyCurrent`].
pub fn migrate_bytes(
    bytes: &[u8],
    policy: UnknownSidePolicy,
) -> Result<MigrationOutcome, MigrationError> {
    let legacy = match StateDocument::parse(bytes)? {
        StateDocument::Current(_) => return Ok(MigrationOutcome::AlreadyCurrent),
        StateDocument::Legacy(legacy) => legacy,
    };

    let (state, mut report) = migrate(&legacy, policy);
    report.dropped_fields = unknown_top_level_keys(bytes);
    for field in &report.dropped_fields {
        warn!(field = %field, "legacy key has no place in the current schema");
    }

    Ok(MigrationOutcome::Migrated {
        state: Box::new(state),
        report,
    })
}

fn unknown_top_level_keys(bytes: &[u8]) -> Vec<String> {
    serde_json::from_slice::<BTreeMap<String, IgnoredAny>>(bytes)
        .map(|keys| {
            keys.into_keys()
                .filter(|key| !LEGACY_FIELDS.contains(&key.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(json: &str) -> LegacyBotState {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_legacy_gives_empty_books() {
        let (state, report) = migrate(
            &legacy(r#"{"EquityUSD": 10, "Lots": []}"#),
            UnknownSidePolicy::Drop,
        );
        assert_eq!(state.book_buy, SideBook::empty());
        assert_eq!(state.book_sell, SideBook::empty());
        assert_eq!(report.migrated_lots(), 0);
    }

    #[test]
    fn null_entries_are_skipped() {
        let (state, report) = migrate(
            &legacy(r#"{"EquityUSD": 10, "Lots": [null, {"Side": "BUY", "OpenPrice": 5}]}"#),
            UnknownSidePolicy::Drop,
        );
        assert_eq!(state.book_buy.len(), 1);
        assert_eq!(report.null_entries, 1);
    }

    #[test]
    fn only_the_runner_gets_a_seeded_trail() {
        let (state, report) = migrate(
            &legacy(
                r#"{"EquityUSD": 10, "Lots": [
                    {"Side": "SELL", "OpenPrice": 5},
                    {"Side": "SELL", "OpenPrice": 6}
                ]}"#,
            ),
            UnknownSidePolicy::Drop,
        );
        assert_eq!(state.book_sell.runner_id, 0);
        assert_eq!(state.book_sell.lots[0].trail_peak, 5.0);
        assert_eq!(state.book_sell.lots[1].trail_peak, 0.0);
        assert_eq!(report.seeded_trails, 1);
    }

    #[test]
    fn migration_does_not_touch_input() {
        let input = legacy(r#"{"EquityUSD": 10, "Lots": [{"Side": "buy", "OpenPrice": 7}]}"#);
        let before = serde_json::to_string(&input).unwrap();
        let _ = migrate(&input, UnknownSidePolicy::Drop);
        assert_eq!(serde_json::to_string(&input).unwrap(), before);
        assert_eq!(input.lots[0].as_ref().unwrap().trail_peak, 0.0);
    }

    #[test]
    fn unknown_keys_are_reported() {
        let outcome = migrate_bytes(
            br#"{"EquityUSD": 1, "Lots": [], "Exits": [], "LastAddEquity": 3}"#,
            UnknownSidePolicy::Drop,
        )
        .unwrap();
        let MigrationOutcome::Migrated { report, .. } = outcome else {
            panic!("expected a migration");
        };
        assert_eq!(report.dropped_fields, vec!["Exits", "LastAddEquity"]);
    }
}
