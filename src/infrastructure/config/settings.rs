//! Operator configuration file.
//!
//! Everything is optional: a missing default file yields the built-in account
//! table, docker as supervisor, and a one-second poll. An explicitly given
//! file must exist.
//!
//! ```toml
//! [controller]
//! kind = "systemd"
//!
//! [watch]
//! interval_ms = 500
//! tolerance = 2.5
//! timeout_secs = 600
//!
//! [accounts.coinbase]
//! service = "bot-coinbase"
//! state_file = "/opt/bot/coinbase/state/bot_state.json"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::accounts::{builtin_accounts, AccountConfig};
use super::logging::LoggingConfig;
use crate::adapter::outbound::supervisor::{SupervisorController, SupervisorKind};
use crate::error::{ConfigError, Result};

/// Overrides `controller.program`.
pub const CONTROLLER_PROGRAM_ENV: &str = "BOTCTL_CONTROLLER_PROGRAM";

/// Which supervisor to drive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub kind: SupervisorKind,
    /// Program to run instead of the supervisor's usual binary.
    pub program: Option<String>,
}

impl ControllerConfig {
    #[must_use]
    pub fn controller(&self) -> SupervisorController {
        match &self.program {
            Some(program) => SupervisorController::with_program(program.clone()),
            None => SupervisorController::new(self.kind),
        }
    }
}

/// Defaults for the equity watch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_ms: u64,
    pub tolerance: Decimal,
    /// Zero waits forever.
    pub timeout_secs: u64,
}

impl WatchConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            tolerance: Decimal::ONE,
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    /// Accounts by name. Empty means the built-in table.
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            logging: LoggingConfig::default(),
            controller: ControllerConfig::default(),
            watch: WatchConfig::default(),
            accounts: BTreeMap::new(),
        };
        config.finish();
        config
    }
}

impl Config {
    /// Parse configuration from TOML content.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.finish();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file that must exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_toml(&content)
    }

    /// Load `path` if it exists, otherwise the defaults.
    pub fn load_if_exists<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Look up an account by name.
    pub fn account(&self, name: &str) -> Result<&AccountConfig> {
        self.accounts.get(name).ok_or_else(|| {
            ConfigError::UnknownAccount {
                name: name.to_string(),
                known: self.accounts.keys().cloned().collect(),
            }
            .into()
        })
    }

    fn finish(&mut self) {
        if self.accounts.is_empty() {
            self.accounts = builtin_accounts();
        }
        if let Ok(program) = std::env::var(CONTROLLER_PROGRAM_ENV) {
            if !program.trim().is_empty() {
                self.controller.program = Some(program);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.watch.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watch.interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.watch.tolerance < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "watch.tolerance",
                reason: "must be 0 or greater".to_string(),
            }
            .into());
        }
        if let Some(program) = &self.controller.program {
            if program.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "controller.program",
                }
                .into());
            }
        }
        for (name, account) in &self.accounts {
            if account.service.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "accounts.service",
                    reason: format!("account '{name}' has an empty service name"),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.watch.interval(), Duration::from_secs(1));
        assert_eq!(config.watch.tolerance, dec!(1));
        assert_eq!(config.watch.timeout(), Duration::ZERO);
        assert_eq!(config.controller.kind, SupervisorKind::Docker);
        assert!(config.accounts.contains_key("hitbtc"));
    }

    #[test]
    fn explicit_accounts_replace_builtins() {
        let config = Config::parse_toml(
            r#"
            [accounts.kraken]
            service = "bot-kraken"
            state_file = "/srv/kraken/state.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.account("kraken").unwrap().service, "bot-kraken");
    }

    #[test]
    fn unknown_account_lists_known_ones() {
        let config = Config::parse_toml("").unwrap();
        let err = config.account("kraken").unwrap_err();
        match err {
            Error::Config(ConfigError::UnknownAccount { name, known }) => {
                assert_eq!(name, "kraken");
                assert_eq!(known, vec!["binance", "coinbase", "hitbtc"]);
            }
            other => panic!("expected unknown account, got {other:?}"),
        }
    }

    #[test]
    fn fractional_tolerance_parses() {
        let config = Config::parse_toml("[watch]\ntolerance = 2.5\n").unwrap();
        assert_eq!(config.watch.tolerance, dec!(2.5));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Config::parse_toml("[watch]\ninterval_ms = 0\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "watch.interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn systemd_kind_selects_systemctl() {
        let config = Config::parse_toml("[controller]\nkind = \"systemd\"\n").unwrap();
        if std::env::var(CONTROLLER_PROGRAM_ENV).is_err() {
            assert_eq!(config.controller.controller().program(), "systemctl");
        }
    }

    #[test]
    fn missing_default_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_if_exists(dir.path().join("config.toml")).unwrap();
        assert_eq!(config.accounts.len(), 3);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ReadFile { .. })));
    }
}
