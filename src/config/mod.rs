//! @acp:module "Configuration"
//! @acp:summary "Account store loading, lookup and persistence"
//! @acp:domain cli
//! @acp:layer config
//!
//! Accounts live in a YAML document, by default `~/.lhbin/config.yaml`.
//! The location can be overridden with the `LHBIN_CONFIG` environment
//! variable. The dispatch core only reads accounts to build drivers; the
//! `account` command is the single writer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LhError, Result};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "LHBIN_CONFIG";

/// One credential set for one driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Driver name, e.g. "fixture"
    pub driver: String,
    /// Operator-chosen account alias, unique per driver
    pub account: String,
    /// Access key ID
    #[serde(default)]
    pub akid: String,
    /// Access key secret
    #[serde(default)]
    pub aksecret: String,
    /// Inventory file, for the fixture driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,
}

impl AccountConfig {
    /// Secret with everything after the first four characters hidden
    pub fn masked_secret(&self) -> String {
        let visible: String = self.aksecret.chars().take(4).collect();
        let hidden = self.aksecret.chars().count().saturating_sub(4);
        format!("{}{}", visible, "*".repeat(hidden))
    }
}

/// Persistent document layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// Accounts plus the file they came from
#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    config: Config,
    path: Option<PathBuf>,
}

impl AccountStore {
    /// Store that never touches the filesystem
    pub fn in_memory(accounts: Vec<AccountConfig>) -> Self {
        Self {
            config: Config { accounts },
            path: None,
        }
    }

    /// Load from `path`; a missing file is an empty store
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Config::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            Config::default()
        };
        tracing::debug!(path = %path.display(), accounts = config.accounts.len(), "loaded account store");
        Ok(Self {
            config,
            path: Some(path.to_path_buf()),
        })
    }

    /// Load from `$LHBIN_CONFIG` or `~/.lhbin/config.yaml`
    pub fn load_default() -> Result<Self> {
        Self::load(default_path()?)
    }

    /// Write the store back to its file, creating the directory if needed
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_yaml::to_string(&self.config)?;
        std::fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "saved account store");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn accounts(&self) -> &[AccountConfig] {
        &self.config.accounts
    }

    /// Insert or replace the account with the same driver and name
    pub fn add(&mut self, account: AccountConfig) {
        match self
            .config
            .accounts
            .iter_mut()
            .find(|a| a.driver == account.driver && a.account == account.account)
        {
            Some(existing) => *existing = account,
            None => self.config.accounts.push(account),
        }
    }

    /// Remove an account; returns whether one was removed
    pub fn delete(&mut self, driver: &str, account: &str) -> bool {
        let before = self.config.accounts.len();
        self.config
            .accounts
            .retain(|a| !(a.driver == driver && a.account == account));
        self.config.accounts.len() != before
    }

    /// Find an account.
    ///
    /// An empty account name selects the first account of the driver; an
    /// empty driver name matches any driver.
    pub fn find(&self, driver: &str, account: &str) -> Result<&AccountConfig> {
        self.config
            .accounts
            .iter()
            .find(|a| {
                (driver.is_empty() || a.driver == driver)
                    && (account.is_empty() || a.account == account)
            })
            .ok_or_else(|| LhError::AccountNotFound {
                driver: if driver.is_empty() {
                    "*".to_string()
                } else {
                    driver.to_string()
                },
                account: account.to_string(),
            })
    }
}

/// Default account store location
pub fn default_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| LhError::Other("cannot determine the home directory".to_string()))?;
    Ok(home.join(".lhbin").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(driver: &str, name: &str) -> AccountConfig {
        AccountConfig {
            driver: driver.to_string(),
            account: name.to_string(),
            akid: format!("{}-id", name),
            aksecret: "secretvalue".to_string(),
            inventory: None,
        }
    }

    #[test]
    fn test_add_replaces_same_driver_and_name() {
        let mut store = AccountStore::in_memory(vec![]);
        store.add(account("fixture", "main"));
        let mut updated = account("fixture", "main");
        updated.akid = "rotated".to_string();
        store.add(updated);
        store.add(account("other", "main"));

        assert_eq!(store.accounts().len(), 2);
        assert_eq!(store.accounts()[0].akid, "rotated");
    }

    #[test]
    fn test_find_defaults_to_first_account() {
        let store = AccountStore::in_memory(vec![
            account("fixture", "main"),
            account("fixture", "backup"),
        ]);
        assert_eq!(store.find("fixture", "").unwrap().account, "main");
        assert_eq!(store.find("", "backup").unwrap().account, "backup");
        assert!(matches!(
            store.find("fixture", "missing"),
            Err(LhError::AccountNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_reports_removal() {
        let mut store = AccountStore::in_memory(vec![account("fixture", "main")]);
        assert!(!store.delete("fixture", "backup"));
        assert!(store.delete("fixture", "main"));
        assert!(store.accounts().is_empty());
    }

    #[test]
    fn test_masked_secret() {
        assert_eq!(account("fixture", "main").masked_secret(), "secr*******");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut store = AccountStore::load(&path).unwrap();
        assert!(store.accounts().is_empty());
        store.add(account("fixture", "main"));
        store.save().unwrap();

        let reloaded = AccountStore::load(&path).unwrap();
        assert_eq!(reloaded.accounts(), store.accounts());
    }
}
