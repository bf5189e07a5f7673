//! Order side and normalization of persisted side tokens.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Side of an open position.
///
/// Persisted as the upper-case tokens `BUY` and `SELL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Both sides, buy first.
    pub const ALL: [Side; 2] = [Side::Buy, Side::Sell];

    /// The persisted token for this side.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Normalize a raw token: case-insensitive match against `BUY`/`SELL`.
    /// Surrounding whitespace is not stripped. Anything else comes back as
    /// [`SideToken::Unrecognized`].
    #[must_use]
    pub fn normalize(raw: &str) -> SideToken {
        if raw.eq_ignore_ascii_case("BUY") {
            SideToken::Recognized(Side::Buy)
        } else if raw.eq_ignore_ascii_case("SELL") {
            SideToken::Recognized(Side::Sell)
        } else {
            SideToken::Unrecognized(raw.to_string())
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Side {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match Side::normalize(&raw) {
            SideToken::Recognized(side) => Ok(side),
            SideToken::Unrecognized(token) => Err(de::Error::custom(format!(
                "unrecognized side {token:?}, expected BUY or SELL"
            ))),
        }
    }
}

/// Result of normalizing a side token read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideToken {
    Recognized(Side),
    /// The original token, unchanged.
    Unrecognized(String),
}

impl SideToken {
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        match self {
            SideToken::Recognized(side) => Some(*side),
            SideToken::Unrecognized(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_case_insensitive() {
        assert_eq!(Side::normalize("buy"), SideToken::Recognized(Side::Buy));
        assert_eq!(Side::normalize("Sell"), SideToken::Recognized(Side::Sell));
    }

    #[test]
    fn padded_tokens_are_unrecognized() {
        assert_eq!(
            Side::normalize(" BUY"),
            SideToken::Unrecognized(" BUY".to_string())
        );
        assert_eq!(Side::normalize("SELL\n").side(), None);
    }

    #[test]
    fn normalize_keeps_unrecognized_token() {
        assert_eq!(
            Side::normalize("LONG"),
            SideToken::Unrecognized("LONG".to_string())
        );
        assert_eq!(Side::normalize("").side(), None);
    }

    #[test]
    fn serializes_as_upper_case_token() {
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"SELL\"");
    }

    #[test]
    fn deserialize_rejects_unknown_token() {
        let err = serde_json::from_str::<Side>("\"SHORT\"").unwrap_err();
        assert!(err.to_string().contains("SHORT"));
        assert_eq!(serde_json::from_str::<Side>("\"buy\"").unwrap(), Side::Buy);
    }
}
