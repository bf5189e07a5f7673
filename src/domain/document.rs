//! Parsing and rendering of whole state documents.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::Serialize;
use serde_json::error::Category;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use super::error::SchemaError;
use super::side::Side;
use super::state::{CurrentBotState, LegacyBotState};

/// Key holding account equity; required in both versions.
pub const EQUITY_FIELD: &str = "EquityUSD";
const LEGACY_LOTS_FIELD: &str = "Lots";
const BOOK_FIELDS: [(&str, Side); 2] = [("BookBuy", Side::Buy), ("BookSell", Side::Sell)];

/// Indentation the trading process uses when it writes the file.
const INDENT: &[u8] = b" ";

/// Which schema a document follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    Legacy,
    Current,
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Legacy => f.write_str("legacy"),
            SchemaVersion::Current => f.write_str("current"),
        }
    }
}

/// A parsed state document of either version.
#[derive(Debug, Clone)]
pub enum StateDocument {
    Legacy(LegacyBotState),
    Current(CurrentBotState),
}

impl StateDocument {
    /// Parse a document, detecting its version.
    ///
    /// A document carrying `BookBuy` or `BookSell` is current; anything else is
    /// treated as legacy. Mandatory keys are checked first so the error names
    /// the missing or misshapen key.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| SchemaError::from_json(&e))?;
        let root = value.as_object().ok_or(SchemaError::NotAnObject)?;

        require_number(root, EQUITY_FIELD)?;

        match detect_version(root) {
            SchemaVersion::Current => {
                for (field, _) in BOOK_FIELDS {
                    let book = root
                        .get(field)
                        .ok_or_else(|| SchemaError::missing(field))?
                        .as_object()
                        .ok_or_else(|| SchemaError::wrong_shape(field, "object"))?;
                    let lots_field = format!("{field}.lots");
                    match book.get("lots") {
                        Some(Value::Array(_)) => {}
                        Some(_) => return Err(SchemaError::wrong_shape(lots_field, "array")),
                        None => return Err(SchemaError::missing(lots_field)),
                    }
                }
                let state: CurrentBotState =
                    serde_json::from_slice(bytes).map_err(|e| SchemaError::from_json(&e))?;
                state.book_buy.validate("BookBuy")?;
                state.book_sell.validate("BookSell")?;
                Ok(StateDocument::Current(state))
            }
            SchemaVersion::Legacy => {
                match root.get(LEGACY_LOTS_FIELD) {
                    Some(Value::Array(_)) => {}
                    Some(_) => return Err(SchemaError::wrong_shape(LEGACY_LOTS_FIELD, "array")),
                    None => return Err(SchemaError::missing(LEGACY_LOTS_FIELD)),
                }
                let state: LegacyBotState =
                    serde_json::from_slice(bytes).map_err(|e| SchemaError::from_json(&e))?;
                Ok(StateDocument::Legacy(state))
            }
        }
    }

    #[must_use]
    pub fn version(&self) -> SchemaVersion {
        match self {
            StateDocument::Legacy(_) => SchemaVersion::Legacy,
            StateDocument::Current(_) => SchemaVersion::Current,
        }
    }

    #[must_use]
    pub fn equity_usd(&self) -> f64 {
        match self {
            StateDocument::Legacy(state) => state.equity_usd,
            StateDocument::Current(state) => state.equity_usd,
        }
    }

    /// Open lots on `side`. Legacy lots count by their normalized side.
    #[must_use]
    pub fn lot_count(&self, side: Side) -> usize {
        match self {
            StateDocument::Legacy(state) => state.lot_count(side),
            StateDocument::Current(state) => state.lot_count(side),
        }
    }
}

fn detect_version(root: &Map<String, Value>) -> SchemaVersion {
    if BOOK_FIELDS.iter().any(|(field, _)| root.contains_key(*field)) {
        SchemaVersion::Current
    } else {
        SchemaVersion::Legacy
    }
}

fn require_number(root: &Map<String, Value>, field: &str) -> Result<(), SchemaError> {
    match root.get(field) {
        Some(Value::Number(_)) => Ok(()),
        Some(_) => Err(SchemaError::wrong_shape(field, "number")),
        None => Err(SchemaError::missing(field)),
    }
}

/// Read a top-level numeric metric from a raw document.
///
/// `None` when the key is absent, `null`, or not a number.
#[must_use]
pub fn read_metric(document: &Value, metric: &str) -> Option<f64> {
    document.get(metric).and_then(Value::as_f64)
}

/// Top-level entries of a document with each value kept as raw JSON.
///
/// Editing one entry re-renders only that entry. Every other value is written
/// back exactly as it was read, in its original position.
#[derive(Debug, Clone)]
pub struct RawDocument {
    entries: Vec<(String, Box<RawValue>)>,
}

impl RawDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        serde_json::from_slice(bytes).map_err(|e| match e.classify() {
            Category::Data => SchemaError::NotAnObject,
            _ => SchemaError::from_json(&e),
        })
    }

    /// Raw value of the first entry named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_ref())
    }

    /// Replace every entry named `key`, or append one if there is none.
    pub fn set(&mut self, key: &str, value: Box<RawValue>) {
        let mut found = false;
        for (name, slot) in &mut self.entries {
            if name == key {
                slot.clone_from(&value);
                found = true;
            }
        }
        if !found {
            self.entries.push((key.to_string(), value));
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl<'de> Deserialize<'de> for RawDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Box<RawValue>>()? {
                    entries.push(entry);
                }
                Ok(RawDocument { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl Serialize for RawDocument {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Render a value the way the trading process writes its state file.
pub fn to_pretty_bytes<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4096);
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;
    Ok(out)
}
