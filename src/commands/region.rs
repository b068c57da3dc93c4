//! @acp:module "Region Command"
//! @acp:summary "List the regions of an account and the zones of a region"
//! @acp:domain cli
//! @acp:layer handler

use clap::Args;

use super::{require, AccountArgs};
use crate::error::Result;
use crate::format;
use crate::operation::{Action, Completion, Invocation, Operation};
use crate::registry::CommandRegistry;

pub const COMMAND: &str = "region";

pub fn register(registry: &mut CommandRegistry) {
    registry.register_command(COMMAND, "Show regions", &[]);
    registry.register_operator(
        COMMAND,
        "list",
        "List regions",
        &[],
        Operation::unconfirmed(Action::new(execute_list)),
    );
    registry.register_operator(
        COMMAND,
        "zones",
        "List the availability zones of a region",
        &["zone"],
        Operation::unconfirmed(Action::new(execute_zones)),
    );
}

#[derive(Debug, Clone, Default, Args)]
pub struct ZonesArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region to list
    #[arg(long)]
    pub region: Option<String>,
}

/// Execute `region list`
pub fn execute_list(args: AccountArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.connect(&*inv.env)?;
    let regions = driver.list_regions()?;

    inv.console.say(&format::rule());
    inv.console
        .say(&format::row(&["Name", "Region", "Available", "Mainland China"]));
    inv.console.say(&format::rule());
    for region in regions {
        let available = if region.available { "yes" } else { "no" };
        let mainland = if region.china_mainland { "yes" } else { "no" };
        inv.console.say(&format::row(&[
            region.name.as_str(),
            region.region.as_str(),
            available,
            mainland,
        ]));
    }
    inv.console.say(&format::rule());
    Ok(Completion::Done)
}

/// Execute `region zones`
pub fn execute_zones(args: ZonesArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let region = require(&args.region, "--region")?;
    let driver = args.account.connect(&*inv.env)?;
    let zones = driver.list_zones(region)?;

    inv.console.say(&format::rule());
    inv.console.say(&format::row(&["Name", "Zone"]));
    inv.console.say(&format::rule());
    for zone in &zones {
        inv.console
            .say(&format::row(&[zone.name.as_str(), zone.zone.as_str()]));
    }
    inv.console.say(&format::rule());
    Ok(Completion::Done)
}
