//! @acp:module "Snapshot Command"
//! @acp:summary "List, create, delete and roll back instance snapshots"
//! @acp:domain cli
//! @acp:layer handler

use clap::Args;

use super::{ids, no_check, require, run_batch, AccountArgs, TargetArgs};
use crate::batch::{self, BatchOptions};
use crate::error::{LhError, Result};
use crate::format;
use crate::operation::{Action, Completion, Invocation, Operation};
use crate::registry::CommandRegistry;

pub const COMMAND: &str = "snapshot";

pub fn register(registry: &mut CommandRegistry) {
    registry.register_command(COMMAND, "Manage snapshots", &["ss"]);
    registry.register_operator(
        COMMAND,
        "list",
        "List snapshots of the selected instances",
        &[],
        Operation::unconfirmed(Action::new(execute_list)),
    );
    registry.register_operator(
        COMMAND,
        "desc",
        "Show snapshot details",
        &["describe"],
        Operation::unconfirmed(Action::new(execute_describe)),
    );
    registry.register_operator(
        COMMAND,
        "del",
        "Delete snapshots",
        &["delete"],
        Operation::simple("", Action::new(execute_delete)),
    );
    registry.register_operator(
        COMMAND,
        "create",
        "Snapshot the selected instances",
        &[],
        Operation::unconfirmed(Action::new(execute_create)),
    );
    registry.register_operator(
        COMMAND,
        "apply",
        "Roll an instance back to a snapshot",
        &[],
        Operation::token(
            "Data written after the snapshot was taken is lost",
            Action::new(execute_apply),
        ),
    );
}

#[derive(Debug, Clone, Args)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Snapshot ID
    #[arg(long)]
    pub ssid: String,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Snapshot ID; overrides --ssids
    #[arg(long, required_unless_present = "ssids")]
    pub ssid: Option<String>,

    /// Comma-separated snapshot IDs
    #[arg(long)]
    pub ssids: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Snapshot name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Snapshot ID
    #[arg(long)]
    pub ssid: String,

    /// Instance to roll back
    #[arg(long)]
    pub insid: String,
}

/// Execute `snapshot list`
pub fn execute_list(args: TargetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    inv.console.say(&format::rule());
    inv.console.say(&format::row(&[
        "Region", "Instance", "Snapshot", "Snapshot ID", "Created", "State",
    ]));
    inv.console.say(&format::rule());
    let completion = run_batch(
        inv,
        &args,
        BatchOptions::new("list snapshots of")
            .without_breadth_confirm()
            .quiet_success(),
        no_check,
        |driver, target, console| {
            for snapshot in driver.list_snapshots(&target.region, &target.instance_id)? {
                console.say(&format::row(&[
                    target.region.clone(),
                    format!("{} ({})", target.name, target.instance_id),
                    snapshot.name,
                    snapshot.id,
                    format::timestamp(&snapshot.created_time),
                    snapshot.state.to_string(),
                ]));
            }
            Ok(())
        },
    )?;
    inv.console
        .say("Run 'lhbin ss desc --region <region> --ssid <id>' for details");
    Ok(completion)
}

/// Execute `snapshot desc`
pub fn execute_describe(args: DescribeArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.account.connect(&*inv.env)?;
    let snapshot = driver.snapshot_info(&args.region, &args.ssid)?;

    inv.console.say(&format::rule());
    for (key, value) in [
        ("Region", args.region.clone()),
        ("Snapshot ID", snapshot.id.clone()),
        ("Name", snapshot.name.clone()),
        ("Instance", snapshot.instance_id.clone()),
        ("State", snapshot.state.to_string()),
        ("Progress", format!("{}%", snapshot.percent)),
        ("Created", format::timestamp(&snapshot.created_time)),
    ] {
        inv.console.say(&format::row(&[key, value.as_str()]));
    }
    inv.console.say(&format::rule());
    Ok(Completion::Done)
}

/// Execute `snapshot del`
pub fn execute_delete(args: DeleteArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let targets = ids(&args.ssid, &args.ssids);
    if targets.is_empty() {
        return Err(LhError::invalid("--ssid or --ssids is required"));
    }
    let driver = args.account.connect(&*inv.env)?;
    batch::each_id(
        &mut *inv.console,
        "delete",
        "snapshot",
        &args.region,
        &targets,
        |id| Ok(driver.delete_snapshots(&args.region, &[id.to_string()])?),
    );
    Ok(Completion::Done)
}

/// Execute `snapshot create`
pub fn execute_create(args: CreateArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let name = args.name.clone().unwrap_or_default();
    run_batch(
        inv,
        &args.targets,
        BatchOptions::new("snapshot"),
        |_| require(&args.name, "--name").map(|_| ()),
        |driver, target, _| {
            driver.create_snapshot(&target.region, &target.instance_id, name.trim())?;
            Ok(())
        },
    )
}

/// Execute `snapshot apply`
pub fn execute_apply(args: ApplyArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.account.connect(&*inv.env)?;
    driver.apply_snapshot(&args.region, &args.insid, &args.ssid)?;
    inv.console.say(&format!(
        "Instance {} in {} rolled back to snapshot {}",
        args.insid, args.region, args.ssid
    ));
    Ok(Completion::Done)
}
