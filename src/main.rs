use std::process::ExitCode;

use botctl::adapter::inbound::cli::command::{normalize_args, Cli};
use botctl::adapter::inbound::cli::entry;
use clap::Parser;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    ExitCode::from(entry::run(cli))
}
