//! Persisted bot state schema.
//!
//! A state file is one JSON document per trading account. Two versions exist:
//!
//! - **legacy**: all open lots in one `Lots` list, side-aware memory optional
//! - **current**: lots split into `BookBuy` / `BookSell`, memory mandatory
//!
//! [`document::StateDocument::parse`] detects the version and checks the
//! mandatory keys.

pub mod book;
pub mod document;
pub mod error;
pub mod position;
pub mod side;
pub mod state;
pub mod time;

pub use book::{SideBook, NO_RUNNER};
pub use document::{RawDocument, SchemaVersion, StateDocument};
pub use error::SchemaError;
pub use position::{LegacyPosition, Position};
pub use side::{Side, SideToken};
pub use state::{CurrentBotState, LegacyBotState};
pub use time::{zero_time, Timestamp};
