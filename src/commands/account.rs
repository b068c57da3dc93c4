//! @acp:module "Account Command"
//! @acp:summary "Add, delete and list configured cloud accounts"
//! @acp:domain cli
//! @acp:layer handler
//!
//! The only operators that write the account store.

use std::path::PathBuf;

use clap::Args;

use super::require;
use crate::config::AccountConfig;
use crate::driver::fixture;
use crate::error::{LhError, Result};
use crate::format;
use crate::operation::{Action, Completion, Invocation, NoFlags, Operation};
use crate::registry::CommandRegistry;

pub const COMMAND: &str = "account";

pub fn register(registry: &mut CommandRegistry) {
    registry.register_command(COMMAND, "Manage accounts; several accounts per driver are supported", &[]);
    registry.register_operator(
        COMMAND,
        "add",
        "Add an account, or replace one with the same driver and name",
        &[],
        Operation::unconfirmed(Action::new(execute_add)),
    );
    registry.register_operator(
        COMMAND,
        "del",
        "Delete an account",
        &["delete"],
        Operation::unconfirmed(Action::new(execute_delete)),
    );
    registry.register_operator(
        COMMAND,
        "list",
        "List accounts",
        &[],
        Operation::unconfirmed(Action::new(execute_list)),
    );
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Driver name
    #[arg(long, default_value = fixture::DRIVER_NAME)]
    pub driver: String,

    /// Account name, free-form, unique per driver
    #[arg(long)]
    pub account: Option<String>,

    /// Access key ID
    #[arg(long, visible_alias = "id")]
    pub akid: Option<String>,

    /// Access key secret
    #[arg(long, visible_alias = "key")]
    pub aksecret: Option<String>,

    /// Inventory file backing a fixture account
    #[arg(long)]
    pub inventory: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    /// Driver name
    #[arg(long, default_value = fixture::DRIVER_NAME)]
    pub driver: String,

    /// Account name
    #[arg(long)]
    pub account: Option<String>,
}

/// Execute `account add`
pub fn execute_add(args: AddArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    if !inv.env.drivers.contains(&args.driver) {
        return Err(LhError::invalid(format!(
            "unknown driver '{}' (available: {})",
            args.driver,
            inv.env.drivers.names().join(", ")
        )));
    }
    let account = require(&args.account, "--account")?.to_string();
    let (akid, aksecret) = if args.driver == fixture::DRIVER_NAME {
        if args.inventory.is_none() {
            return Err(LhError::invalid("--inventory is required for fixture accounts"));
        }
        (
            args.akid.clone().unwrap_or_default(),
            args.aksecret.clone().unwrap_or_default(),
        )
    } else {
        (
            require(&args.akid, "--akid")?.to_string(),
            require(&args.aksecret, "--aksecret")?.to_string(),
        )
    };

    inv.env.accounts.add(AccountConfig {
        driver: args.driver.clone(),
        account: account.clone(),
        akid,
        aksecret,
        inventory: args.inventory.clone(),
    });
    inv.env.accounts.save()?;
    inv.console
        .say(&format!("Account {} ({}) saved", account, args.driver));
    Ok(Completion::Done)
}

/// Execute `account del`
pub fn execute_delete(args: DeleteArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let account = require(&args.account, "--account")?;
    if !inv.env.accounts.delete(&args.driver, account) {
        return Err(LhError::AccountNotFound {
            driver: args.driver.clone(),
            account: account.to_string(),
        });
    }
    inv.env.accounts.save()?;
    inv.console
        .say(&format!("Account {} ({}) deleted", account, args.driver));
    Ok(Completion::Done)
}

/// Execute `account list`
pub fn execute_list(_: NoFlags, inv: &mut Invocation<'_>) -> Result<Completion> {
    inv.console.say(&format::rule());
    inv.console
        .say(&format::row(&["Driver", "Account", "AKID", "AKSecret"]));
    inv.console.say(&format::rule());
    for account in inv.env.accounts.accounts() {
        inv.console.say(&format::row(&[
            account.driver.as_str(),
            account.account.as_str(),
            account.akid.as_str(),
            account.masked_secret().as_str(),
        ]));
    }
    inv.console.say(&format::rule());
    Ok(Completion::Done)
}
