//! Command-line interface definitions.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::application::injection::DEFAULT_METRIC;
use crate::application::UnknownSidePolicy;
use crate::domain::Side;

/// Operator tooling for trading bot state files
#[derive(Parser, Debug)]
#[command(name = "botctl")]
#[command(version, about)]
pub struct Cli {
    /// Config file [default: ~/.botctl/config.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for a deposit to show up, then raise the allocation baselines
    Inject(InjectArgs),

    /// Convert a legacy state file to per-side books
    Migrate(MigrateArgs),

    /// Show a state file's schema, equity, and books
    Inspect(InspectArgs),

    /// Check two state files for sides that lost all their lots
    Compare(CompareArgs),
}

/// Arguments for `botctl inject`.
#[derive(Args, Debug)]
pub struct InjectArgs {
    /// Amount deposited (negative for a withdrawal)
    #[arg(allow_negative_numbers = true)]
    pub amount: Decimal,

    /// Account name
    pub account: String,

    /// State file [default: the account's configured file]
    pub state_file: Option<PathBuf>,

    /// Accepted distance from the expected metric value
    #[arg(long, allow_negative_numbers = true)]
    pub tolerance: Option<Decimal>,

    /// Seconds to wait for the deposit; 0 waits forever
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Top-level numeric key to watch
    #[arg(long, default_value = DEFAULT_METRIC)]
    pub metric: String,

    /// Restart the service without asking
    #[arg(short = 'y', long, conflicts_with = "no_restart")]
    pub yes: bool,

    /// Leave the service stopped afterwards
    #[arg(long)]
    pub no_restart: bool,
}

/// Arguments for `botctl migrate`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["out", "inplace"])))]
pub struct MigrateArgs {
    /// Legacy state file
    #[arg(long = "in", value_name = "PATH")]
    pub input: PathBuf,

    /// Write the migrated state here
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Replace the input, keeping a .bak copy
    #[arg(long)]
    pub inplace: bool,

    /// Where lots with an unrecognized side go
    #[arg(long, value_enum, default_value_t = UnknownSide::Drop)]
    pub unknown_side: UnknownSide,
}

/// Command-line form of [`UnknownSidePolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum UnknownSide {
    Drop,
    Buy,
    Sell,
}

impl From<UnknownSide> for UnknownSidePolicy {
    fn from(value: UnknownSide) -> Self {
        match value {
            UnknownSide::Drop => UnknownSidePolicy::Drop,
            UnknownSide::Buy => UnknownSidePolicy::Route(Side::Buy),
            UnknownSide::Sell => UnknownSidePolicy::Route(Side::Sell),
        }
    }
}

/// Arguments for `botctl inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Account whose configured state file to read
    #[arg(required_unless_present = "state")]
    pub account: Option<String>,

    /// Read this file instead of an account's
    #[arg(long, value_name = "PATH", conflicts_with = "account")]
    pub state: Option<PathBuf>,
}

/// Arguments for `botctl compare`.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// State before the change (e.g. a backup)
    pub before: PathBuf,

    /// State after the change
    pub after: PathBuf,
}

/// Single-dash spellings the legacy migration tool accepted.
const LEGACY_MIGRATE_FLAGS: [(&str, &str); 4] = [
    ("-in", "--in"),
    ("-out", "--out"),
    ("-inplace", "--inplace"),
    ("-unknown-side", "--unknown-side"),
];

/// Rewrite legacy single-dash `migrate` flags to their long form.
///
/// Only tokens after the `migrate` subcommand and before `--` are touched.
pub fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    let mut in_migrate = false;
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            if passthrough || !in_migrate {
                in_migrate |= arg == "migrate";
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            LEGACY_MIGRATE_FLAGS
                .iter()
                .find(|(legacy, _)| arg == *legacy)
                .map_or(arg, |(_, long)| OsString::from(*long))
        })
        .collect()
}
