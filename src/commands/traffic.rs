//! @acp:module "Traffic Package Command"
//! @acp:summary "Show the monthly traffic package usage of instances"
//! @acp:domain cli
//! @acp:layer handler

use super::{no_check, run_batch, TargetArgs};
use crate::batch::BatchOptions;
use crate::driver::DriverError;
use crate::error::Result;
use crate::format;
use crate::operation::{Action, Completion, Invocation, Operation};
use crate::registry::CommandRegistry;

pub const COMMAND: &str = "trafficpackage";

pub fn register(registry: &mut CommandRegistry) {
    registry.register_command(COMMAND, "Show traffic packages", &["tp"]);
    registry.register_operator(
        COMMAND,
        "list",
        "Show traffic package usage of the selected instances",
        &[],
        Operation::unconfirmed(Action::new(execute_list)),
    );
}

/// Execute `trafficpackage list`
pub fn execute_list(args: TargetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    inv.console.say(&format::rule());
    inv.console
        .say(&format::row(&["Region", "Instance", "Total", "Used", "Remaining"]));
    inv.console.say(&format::rule());
    run_batch(
        inv,
        &args,
        BatchOptions::new("traffic package of")
            .without_breadth_confirm()
            .quiet_success(),
        no_check,
        |driver, target, console| {
            let packages =
                driver.traffic_packages(&target.region, &[target.instance_id.clone()])?;
            let package = packages
                .into_iter()
                .next()
                .ok_or_else(|| DriverError::not_found("traffic package", &target.instance_id))?;
            console.say(&format::row(&[
                target.region.clone(),
                format!("{} ({})", target.name, target.instance_id),
                format::size(package.total),
                format::size(package.used),
                format::size(package.remaining),
            ]));
            Ok(())
        },
    )
}
