//! Open trade lots in both schema versions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::side::{Side, SideToken};
use super::time::{zero_time, Timestamp};

/// One open trade lot in the current schema.
///
/// Keys the trading process added after this schema was drawn up (lot ids,
/// exit modes, fee estimates) are kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Position {
    #[serde(default)]
    pub open_price: f64,
    pub side: Side,
    #[serde(default)]
    pub size_base: f64,
    #[serde(default)]
    pub stop: f64,
    #[serde(default)]
    pub take: f64,
    #[serde(default = "zero_time")]
    pub open_time: Timestamp,
    #[serde(default)]
    pub entry_fee: f64,
    #[serde(default)]
    pub trail_active: bool,
    #[serde(default)]
    pub trail_peak: f64,
    #[serde(default)]
    pub trail_stop: f64,
    #[serde(rename = "reason", default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Position {
    /// Seed the trailing peak with the open price when it was never set.
    ///
    /// A non-zero peak is left alone. Returns whether the peak changed.
    pub fn seed_trail_peak(&mut self) -> bool {
        if self.trail_peak == 0.0 {
            self.trail_peak = self.open_price;
            return self.trail_peak != 0.0;
        }
        false
    }
}

/// One lot in the legacy aggregate `Lots` list.
///
/// The side is still a raw token here; it only becomes a [`Side`] once it has
/// been normalized during migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyPosition {
    #[serde(default)]
    pub open_price: f64,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub size_base: f64,
    #[serde(default)]
    pub stop: f64,
    #[serde(default)]
    pub take: f64,
    #[serde(default = "zero_time")]
    pub open_time: Timestamp,
    #[serde(default)]
    pub entry_fee: f64,
    #[serde(default)]
    pub trail_active: bool,
    #[serde(default)]
    pub trail_peak: f64,
    #[serde(default)]
    pub trail_stop: f64,
    #[serde(rename = "reason", default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LegacyPosition {
    #[must_use]
    pub fn side_token(&self) -> SideToken {
        Side::normalize(&self.side)
    }

    /// Convert into a current-schema lot on `side`, copying every other field.
    #[must_use]
    pub fn to_position(&self, side: Side) -> Position {
        Position {
            open_price: self.open_price,
            side,
            size_base: self.size_base,
            stop: self.stop,
            take: self.take,
            open_time: self.open_time,
            entry_fee: self.entry_fee,
            trail_active: self.trail_active,
            trail_peak: self.trail_peak,
            trail_stop: self.trail_stop,
            reason: self.reason.clone(),
            extra: self.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(open_price: f64, trail_peak: f64) -> Position {
        Position {
            open_price,
            side: Side::Buy,
            size_base: 0.5,
            stop: 0.0,
            take: 0.0,
            open_time: zero_time(),
            entry_fee: 0.0,
            trail_active: false,
            trail_peak,
            trail_stop: 0.0,
            reason: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn seed_trail_peak_fills_zero_peak() {
        let mut position = lot(100.0, 0.0);
        assert!(position.seed_trail_peak());
        assert_eq!(position.trail_peak, 100.0);
    }

    #[test]
    fn seed_trail_peak_keeps_existing_peak() {
        let mut position = lot(100.0, 42.0);
        assert!(!position.seed_trail_peak());
        assert_eq!(position.trail_peak, 42.0);
    }

    #[test]
    fn unknown_position_keys_survive_round_trip() {
        let json = r#"{"OpenPrice":10.5,"Side":"SELL","lot_id":7,"exit_mode":"ScalpTrailing"}"#;
        let position: Position = serde_json::from_str(json).unwrap();
        assert_eq!(position.extra.get("lot_id"), Some(&Value::from(7)));

        let back = serde_json::to_value(&position).unwrap();
        assert_eq!(back["exit_mode"], "ScalpTrailing");
        assert_eq!(back["OpenPrice"], 10.5);
        assert!(back.get("reason").is_none());
    }

    #[test]
    fn legacy_lot_keeps_raw_side_token() {
        let json = r#"{"OpenPrice":1.0,"Side":"long","reason":"dip"}"#;
        let legacy: LegacyPosition = serde_json::from_str(json).unwrap();
        assert_eq!(legacy.side_token(), SideToken::Unrecognized("long".into()));

        let converted = legacy.to_position(Side::Buy);
        assert_eq!(converted.side, Side::Buy);
        assert_eq!(converted.reason.as_deref(), Some("dip"));
    }
}
