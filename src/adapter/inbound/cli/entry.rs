//! Command dispatch and exit-code mapping.

use tracing::debug;

use super::command::{Cli, ColorChoice, Commands};
use super::diagnostic::{self, Failure};
use super::output::{self, OutputConfig};
use super::{compare, inject, inspect, migrate, paths};
use crate::infrastructure::config::{Config, LoggingConfig};

/// Run a parsed command line and return the process exit code.
pub fn run(cli: Cli) -> u8 {
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(failure) => {
            LoggingConfig::default().init(cli.verbose);
            return diagnostic::report(&failure, cli.color);
        }
    };
    config.logging.init(cli.verbose);
    debug!(accounts = config.accounts.len(), "configuration loaded");

    let result = match &cli.command {
        Commands::Inject(args) => inject::execute(&config, args),
        Commands::Migrate(args) => migrate::execute(args),
        Commands::Inspect(args) => inspect::execute(&config, args),
        Commands::Compare(args) => compare::execute(args),
    };

    match result {
        Ok(code) => code,
        Err(failure) => diagnostic::report(&failure, cli.color),
    }
}

fn load_config(cli: &Cli) -> Result<Config, Failure> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_if_exists(paths::default_config())?,
    };
    Ok(config)
}
