//! CLI module graph.

pub mod command;
pub mod compare;
pub mod diagnostic;
pub mod entry;
pub mod inject;
pub mod inspect;
pub mod migrate;
pub mod output;
pub mod paths;
