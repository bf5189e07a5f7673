//! Top-level bot state, legacy and current.
//!
//! The legacy schema kept every open lot in a single `Lots` list and treated
//! the side-aware memory as optional. The current schema splits lots into
//! `BookBuy`/`BookSell` and makes every memory field mandatory.
//!
//! `Model` and `MdlExt` belong to the trading logic. They are held as raw JSON
//! and written back byte-for-byte.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::book::SideBook;
use super::position::{LegacyPosition, Position};
use super::side::Side;
use super::time::{zero_time, Timestamp};

/// Opaque payload owned by the trading logic.
pub type OpaqueBlob = Option<Box<RawValue>>;

/// Top-level keys the legacy schema knows about.
pub const LEGACY_FIELDS: &[&str] = &[
    "EquityUSD",
    "DailyStart",
    "DailyPnL",
    "Lots",
    "Model",
    "MdlExt",
    "WalkForwardMin",
    "LastFit",
    "LastAddBuy",
    "LastAddSell",
    "WinLowBuy",
    "WinHighSell",
    "LatchedGateBuy",
    "LatchedGateSell",
    "LastAddEquitySell",
    "LastAddEquityBuy",
    "EquityStageBuy",
    "EquityStageSell",
];

/// Legacy persisted state with the aggregate `Lots` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyBotState {
    #[serde(rename = "EquityUSD")]
    pub equity_usd: f64,
    #[serde(default = "zero_time")]
    pub daily_start: Timestamp,
    #[serde(rename = "DailyPnL", default)]
    pub daily_pnl: f64,
    /// `null` entries are tolerated and skipped.
    pub lots: Vec<Option<LegacyPosition>>,
    #[serde(default)]
    pub model: OpaqueBlob,
    #[serde(default)]
    pub mdl_ext: OpaqueBlob,
    #[serde(default)]
    pub walk_forward_min: i64,
    #[serde(default = "zero_time")]
    pub last_fit: Timestamp,

    // Absent in the oldest files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_add_buy: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_add_sell: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_low_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_high_sell: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latched_gate_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latched_gate_sell: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_add_equity_sell: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_add_equity_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_stage_buy: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_stage_sell: Option<i64>,
}

impl LegacyBotState {
    /// Lots whose side normalizes to `side`.
    #[must_use]
    pub fn lot_count(&self, side: Side) -> usize {
        self.lots
            .iter()
            .flatten()
            .filter(|lot| lot.side_token().side() == Some(side))
            .count()
    }
}

/// Current persisted state with per-side books.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurrentBotState {
    #[serde(rename = "EquityUSD")]
    pub equity_usd: f64,
    #[serde(default = "zero_time")]
    pub daily_start: Timestamp,
    #[serde(rename = "DailyPnL", default)]
    pub daily_pnl: f64,
    #[serde(default)]
    pub model: OpaqueBlob,
    #[serde(default)]
    pub mdl_ext: OpaqueBlob,
    #[serde(default)]
    pub walk_forward_min: i64,
    #[serde(default = "zero_time")]
    pub last_fit: Timestamp,

    pub book_buy: SideBook,
    pub book_sell: SideBook,

    #[serde(default = "zero_time")]
    pub last_add_buy: Timestamp,
    #[serde(default = "zero_time")]
    pub last_add_sell: Timestamp,
    #[serde(default)]
    pub win_low_buy: f64,
    #[serde(default)]
    pub win_high_sell: f64,
    #[serde(default)]
    pub latched_gate_buy: f64,
    #[serde(default)]
    pub latched_gate_sell: f64,

    #[serde(default)]
    pub last_add_equity_sell: f64,
    #[serde(default)]
    pub last_add_equity_buy: f64,
    #[serde(default)]
    pub equity_stage_buy: i64,
    #[serde(default)]
    pub equity_stage_sell: i64,
}

impl CurrentBotState {
    #[must_use]
    pub fn book(&self, side: Side) -> &SideBook {
        match side {
            Side::Buy => &self.book_buy,
            Side::Sell => &self.book_sell,
        }
    }

    #[must_use]
    pub fn lot_count(&self, side: Side) -> usize {
        self.book(side).len()
    }

    /// Allocation baseline recorded at the last add on `side`.
    #[must_use]
    pub fn last_add_equity(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.last_add_equity_buy,
            Side::Sell => self.last_add_equity_sell,
        }
    }

    /// All open lots, buy book first.
    pub fn lots(&self) -> impl Iterator<Item = &Position> {
        self.book_buy.lots.iter().chain(self.book_sell.lots.iter())
    }
}
