//! Post-mutation check for silently wiped positions.
//!
//! The guard only looks at open-lot counts per side. A side that had lots
//! before a mutation and has none after is treated as data loss; nothing else
//! in the document is validated.

use std::fmt;

use serde::Serialize;

use crate::domain::{Side, StateDocument};

/// Open-lot counts per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub buy: usize,
    pub sell: usize,
}

impl Fingerprint {
    #[must_use]
    pub fn of(document: &StateDocument) -> Self {
        Self {
            buy: document.lot_count(Side::Buy),
            sell: document.lot_count(Side::Sell),
        }
    }

    #[must_use]
    pub fn count(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.buy,
            Side::Sell => self.sell,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buy={} sell={}", self.buy, self.sell)
    }
}

/// Outcome of comparing two fingerprints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Safe,
    /// These sides went from open lots to none.
    Unsafe { wiped: Vec<Side> },
}

impl GuardVerdict {
    #[must_use]
    pub fn is_safe(&self) -> bool {
        matches!(self, GuardVerdict::Safe)
    }
}

/// Compare pre- and post-mutation fingerprints.
#[must_use]
pub fn check(before: Fingerprint, after: Fingerprint) -> GuardVerdict {
    let wiped: Vec<Side> = Side::ALL
        .into_iter()
        .filter(|side| before.count(*side) > 0 && after.count(*side) == 0)
        .collect();

    if wiped.is_empty() {
        GuardVerdict::Safe
    } else {
        GuardVerdict::Unsafe { wiped }
    }
}
