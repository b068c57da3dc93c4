//! @acp:module "Drivers"
//! @acp:summary "Driver capability trait and the catalog of driver constructors"
//! @acp:domain cloud
//! @acp:layer service
//!
//! A [`Driver`] is one cloud account's ability to list and mutate resources.
//! The dispatch core never talks to a vendor API directly; it resolves an
//! account from the [`crate::config::AccountStore`] and asks the
//! [`DriverCatalog`] for a driver built from that account.
//!
//! Every call is synchronous and returns a [`DriverError`] on failure. Batch
//! operators turn those errors into per-target outcomes.

pub mod fixture;
pub mod types;

use std::collections::HashMap;

use thiserror::Error;

use crate::config::AccountConfig;
use crate::error::{LhError, Result};

pub use fixture::{FixtureDriver, Inventory};
pub use types::*;

/// Failure of a single driver call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The addressed resource does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The provider refused the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or the driver cannot serve the call
    #[error("driver unavailable: {0}")]
    Unavailable(String),
}

impl DriverError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        DriverError::NotFound { kind, id: id.into() }
    }
}

/// Result of a driver call
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Resource operations of one cloud account.
///
/// Region and target IDs are provider identifiers. Bulk mutators accept a
/// slice of IDs; the batch executor always passes exactly one.
pub trait Driver {
    /// Driver name as it appears in account records
    fn name(&self) -> &str;

    fn list_regions(&self) -> DriverResult<Vec<Region>>;
    fn list_zones(&self, region: &str) -> DriverResult<Vec<Zone>>;

    fn list_instances(&self, region: &str) -> DriverResult<Vec<Instance>>;
    fn instance_info(&self, region: &str, instance_id: &str) -> DriverResult<Instance>;
    fn stop_instances(&self, region: &str, instance_ids: &[String]) -> DriverResult<()>;
    fn start_instances(&self, region: &str, instance_ids: &[String]) -> DriverResult<()>;
    fn restart_instances(&self, region: &str, instance_ids: &[String]) -> DriverResult<()>;
    fn terminate_instances(&self, region: &str, instance_ids: &[String]) -> DriverResult<()>;
    fn reset_instances(
        &self,
        region: &str,
        instance_ids: &[String],
        blueprint_id: &str,
    ) -> DriverResult<()>;
    fn reset_password(
        &self,
        region: &str,
        instance_ids: &[String],
        username: &str,
        password: &str,
    ) -> DriverResult<()>;

    fn traffic_packages(
        &self,
        region: &str,
        instance_ids: &[String],
    ) -> DriverResult<Vec<TrafficPackage>>;

    fn list_snapshots(&self, region: &str, instance_id: &str) -> DriverResult<Vec<Snapshot>>;
    fn snapshot_info(&self, region: &str, snapshot_id: &str) -> DriverResult<Snapshot>;
    fn delete_snapshots(&self, region: &str, snapshot_ids: &[String]) -> DriverResult<()>;
    fn create_snapshot(&self, region: &str, instance_id: &str, name: &str)
        -> DriverResult<Snapshot>;
    fn apply_snapshot(&self, region: &str, instance_id: &str, snapshot_id: &str)
        -> DriverResult<()>;

    fn list_blueprints(
        &self,
        region: &str,
        platform: PlatformType,
        kind: BlueprintType,
    ) -> DriverResult<Vec<Blueprint>>;
    fn blueprint_info(&self, region: &str, blueprint_id: &str) -> DriverResult<Blueprint>;
    fn delete_blueprints(&self, region: &str, blueprint_ids: &[String]) -> DriverResult<()>;
    fn create_blueprint(
        &self,
        region: &str,
        instance_id: &str,
        name: &str,
        description: &str,
    ) -> DriverResult<Blueprint>;

    fn list_firewall_rules(&self, region: &str, instance_id: &str)
        -> DriverResult<Vec<FirewallRule>>;
    fn add_firewall_rules(
        &self,
        region: &str,
        instance_id: &str,
        rules: &[FirewallRule],
    ) -> DriverResult<()>;
    /// Replaces the whole rule set of the instance
    fn update_firewall_rules(
        &self,
        region: &str,
        instance_id: &str,
        rules: &[FirewallRule],
    ) -> DriverResult<()>;
    fn delete_firewall_rules(
        &self,
        region: &str,
        instance_id: &str,
        rules: &[FirewallRule],
    ) -> DriverResult<()>;

    fn list_key_pairs(&self, region: &str) -> DriverResult<Vec<KeyPair>>;
    fn create_key_pair(&self, region: &str, name: &str) -> DriverResult<KeyPair>;
    fn import_key_pair(&self, region: &str, name: &str, public_key: &str)
        -> DriverResult<KeyPair>;
    fn delete_key_pairs(&self, region: &str, key_ids: &[String]) -> DriverResult<()>;
    fn bind_key_pairs(
        &self,
        region: &str,
        key_ids: &[String],
        instance_ids: &[String],
    ) -> DriverResult<()>;
    fn unbind_key_pairs(
        &self,
        region: &str,
        key_ids: &[String],
        instance_ids: &[String],
    ) -> DriverResult<()>;
}

/// Builds a driver from an account record
pub type DriverConstructor = Box<dyn Fn(&AccountConfig) -> Result<Box<dyn Driver>>>;

/// Named driver constructors available to this process
pub struct DriverCatalog {
    constructors: HashMap<String, DriverConstructor>,
}

impl DriverCatalog {
    /// Catalog with no drivers at all
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Catalog with the drivers compiled into this binary
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.register(fixture::DRIVER_NAME, |account| {
            let driver = FixtureDriver::from_account(account)?;
            Ok(Box::new(driver) as Box<dyn Driver>)
        });
        catalog
    }

    /// Register (or replace) a constructor under `name`
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&AccountConfig) -> Result<Box<dyn Driver>> + 'static,
    {
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Sorted driver names, for help and validation messages
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Construct the driver an account refers to
    pub fn open(&self, account: &AccountConfig) -> Result<Box<dyn Driver>> {
        let constructor = self
            .constructors
            .get(&account.driver)
            .ok_or_else(|| LhError::UnknownDriver(account.driver.clone()))?;
        tracing::debug!(driver = %account.driver, account = %account.account, "opening driver");
        constructor(account)
    }
}

impl Default for DriverCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_has_fixture() {
        let catalog = DriverCatalog::builtin();
        assert!(catalog.contains("fixture"));
        assert_eq!(catalog.names(), vec!["fixture"]);
    }

    #[test]
    fn test_open_unknown_driver() {
        let catalog = DriverCatalog::builtin();
        let account = AccountConfig {
            driver: "qqcloud".to_string(),
            account: "main".to_string(),
            ..Default::default()
        };
        match catalog.open(&account) {
            Err(LhError::UnknownDriver(name)) => assert_eq!(name, "qqcloud"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("qqcloud should not be built in"),
        }
    }

    #[test]
    fn test_register_custom_constructor() {
        let mut catalog = DriverCatalog::empty();
        catalog.register("memory", |_| {
            Ok(Box::new(FixtureDriver::new(Inventory::default())) as Box<dyn Driver>)
        });
        let account = AccountConfig {
            driver: "memory".to_string(),
            ..Default::default()
        };
        let driver = catalog.open(&account).unwrap();
        assert_eq!(driver.name(), "fixture");
    }
}
