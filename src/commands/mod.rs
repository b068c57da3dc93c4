//! @acp:module "Commands"
//! @acp:summary "Operator catalogue: command registration and shared operator flags"
//! @acp:domain cli
//! @acp:layer handler
//!
//! Each submodule registers one command and its operators. Operators declare
//! their flags as `clap::Args` structs; [`AccountArgs`] and [`TargetArgs`]
//! are flattened into them where needed.

pub mod account;
pub mod blueprint;
pub mod firewall;
pub mod instance;
pub mod keypair;
pub mod region;
pub mod snapshot;
pub mod traffic;

use clap::Args;

use crate::batch::{self, BatchOptions, ResolvedTarget, TargetFilter};
use crate::driver::Driver;
use crate::error::{LhError, Result};
use crate::operation::{Completion, Environment, Invocation};
use crate::registry::CommandRegistry;
use crate::terminal::Console;

/// Register every built-in command, in help order
pub fn register_all(registry: &mut CommandRegistry) {
    account::register(registry);
    region::register(registry);
    instance::register(registry);
    traffic::register(registry);
    snapshot::register(registry);
    blueprint::register(registry);
    firewall::register(registry);
    keypair::register(registry);
}

/// Registry with every built-in command
pub fn builtin_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    register_all(&mut registry);
    registry
}

/// Which configured account to act as
#[derive(Debug, Clone, Default, Args)]
pub struct AccountArgs {
    /// Driver name; any driver when omitted
    #[arg(long)]
    pub driver: Option<String>,

    /// Account name; the first account of the driver when omitted
    #[arg(long)]
    pub account: Option<String>,
}

impl AccountArgs {
    pub fn connect(&self, env: &Environment) -> Result<Box<dyn Driver>> {
        env.connect(
            self.driver.as_deref().unwrap_or(""),
            self.account.as_deref().unwrap_or(""),
        )
    }
}

/// Instance selection of batch operators
#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region; every region when omitted
    #[arg(long)]
    pub region: Option<String>,

    /// Instance ID; overrides --insids
    #[arg(long)]
    pub insid: Option<String>,

    /// Comma-separated instance IDs; every instance of the region when omitted
    #[arg(long)]
    pub insids: Option<String>,

    /// Skip the confirmation for wide selections
    #[arg(short = 'f', long)]
    pub force: bool,
}

impl TargetArgs {
    pub fn filter(&self) -> TargetFilter {
        TargetFilter::from_flags(
            self.region.as_deref().unwrap_or(""),
            self.insids.as_deref().unwrap_or(""),
            self.insid.as_deref().unwrap_or(""),
            self.force,
        )
    }
}

/// Value of a mandatory flag
pub(crate) fn require<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LhError::invalid(format!("{} is required", flag))),
    }
}

/// Single ID flag overriding a comma-list flag, as used by delete operators
pub(crate) fn ids(single: &Option<String>, list: &Option<String>) -> Vec<String> {
    match single.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => vec![id.to_string()],
        _ => batch::split_ids(list.as_deref().unwrap_or("")),
    }
}

/// Connect with the target's account and run a batch over its filter
pub(crate) fn run_batch<C, F>(
    inv: &mut Invocation<'_>,
    targets: &TargetArgs,
    options: BatchOptions,
    check: C,
    per_target: F,
) -> Result<Completion>
where
    C: FnOnce(&TargetFilter) -> Result<()>,
    F: FnMut(&dyn Driver, &ResolvedTarget, &mut dyn Console) -> Result<()>,
{
    let filter = targets.filter();
    let driver = targets.account.connect(&*inv.env)?;
    let summary = batch::execute(
        driver.as_ref(),
        &mut *inv.console,
        &filter,
        &options,
        check,
        per_target,
    )?;
    Ok(summary.completion())
}

/// Batch with no operator-specific flags to check
pub(crate) fn no_check(_: &TargetFilter) -> Result<()> {
    Ok(())
}
