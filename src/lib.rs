//! botctl - operator tooling for a trading bot's persisted state.
//!
//! Each trading account runs one long-lived process that keeps its state in a
//! single JSON document. This crate reads and rewrites that document safely:
//!
//! - **migration** of the legacy single-list layout to per-side books
//! - **capital injection**: wait for a deposit to show in equity, stop the
//!   process, raise the per-side allocation baselines, check that no
//!   positions were lost, and restart
//!
//! # Modules
//!
//! - [`domain`] - state document schema, both versions
//! - [`application`] - migration, equity watch, regression guard, injection
//! - [`port`] - traits for the supervisor and metric sources
//! - [`adapter`] - atomic file store, supervisor commands, CLI
//! - [`infrastructure`] - configuration and logging setup
//! - [`error`] - error types and exit codes

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;
