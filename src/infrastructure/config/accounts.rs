//! Trading accounts and where their processes keep state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Accounts known without a config file.
const BUILTIN_ACCOUNTS: [&str; 3] = ["coinbase", "binance", "hitbtc"];

/// One trading account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountConfig {
    /// Supervisor name of the trading process.
    pub service: String,
    /// State file the process persists to.
    pub state_file: PathBuf,
}

impl AccountConfig {
    /// Conventional layout for an account named `name`.
    #[must_use]
    pub fn conventional(name: &str) -> Self {
        Self {
            service: format!("bot-{name}"),
            state_file: PathBuf::from(format!("/opt/bot/{name}/state/bot_state.json")),
        }
    }
}

/// Default account table.
#[must_use]
pub fn builtin_accounts() -> BTreeMap<String, AccountConfig> {
    BUILTIN_ACCOUNTS
        .iter()
        .map(|name| ((*name).to_string(), AccountConfig::conventional(name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_follow_convention() {
        let accounts = builtin_accounts();
        assert_eq!(accounts.len(), 3);
        let coinbase = &accounts["coinbase"];
        assert_eq!(coinbase.service, "bot-coinbase");
        assert_eq!(
            coinbase.state_file,
            PathBuf::from("/opt/bot/coinbase/state/bot_state.json")
        );
    }
}
