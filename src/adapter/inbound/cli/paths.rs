//! Path utilities for botctl.
//!
//! Operator settings live under `~/.botctl/`:
//! - `~/.botctl/config.toml` - accounts, supervisor, watch defaults

use std::path::PathBuf;

/// Returns the botctl home directory (`~/.botctl/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".botctl")
}

/// Returns the default config file path (`~/.botctl/config.toml`).
pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_is_under_botctl_home() {
        let config = default_config();
        assert!(config.starts_with(home_dir()));
        assert!(config.to_string_lossy().contains(".botctl"));
        assert!(config.ends_with("config.toml"));
    }
}
