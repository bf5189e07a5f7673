//! Timestamps as the trading process persists them.

use chrono::{DateTime, FixedOffset, NaiveDate};

/// RFC 3339 timestamp with the offset it was written with.
pub type Timestamp = DateTime<FixedOffset>;

/// The zero time, `0001-01-01T00:00:00Z`.
///
/// This is what the trading process writes for a timestamp that was never set,
/// so it is also the default for absent timestamp fields.
#[must_use]
pub fn zero_time() -> Timestamp {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .unwrap_or_default()
}

/// Whether `ts` is the zero time.
#[must_use]
pub fn is_zero_time(ts: &Timestamp) -> bool {
    *ts == zero_time()
}
