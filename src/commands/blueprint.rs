//! @acp:module "Blueprint Command"
//! @acp:summary "List, describe, create and delete images"
//! @acp:domain cli
//! @acp:layer handler

use clap::Args;

use super::{ids, require, run_batch, AccountArgs, TargetArgs};
use crate::batch::{self, BatchOptions};
use crate::driver::{BlueprintType, PlatformType};
use crate::error::{LhError, Result};
use crate::format;
use crate::operation::{Action, Completion, Invocation, Operation};
use crate::registry::CommandRegistry;

pub const COMMAND: &str = "blueprint";

pub fn register(registry: &mut CommandRegistry) {
    registry.register_command(COMMAND, "Manage images", &["image", "bp"]);
    registry.register_operator(
        COMMAND,
        "list",
        "List images of a region",
        &[],
        Operation::unconfirmed(Action::new(execute_list)),
    );
    registry.register_operator(
        COMMAND,
        "desc",
        "Show image details",
        &["describe"],
        Operation::unconfirmed(Action::new(execute_describe)),
    );
    registry.register_operator(
        COMMAND,
        "del",
        "Delete private images",
        &["delete"],
        Operation::token("A deleted image cannot be restored", Action::new(execute_delete)),
    );
    registry.register_operator(
        COMMAND,
        "create",
        "Create private images from the selected instances",
        &[],
        Operation::unconfirmed(Action::new(execute_create)),
    );
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Operating system: all, linux, win
    #[arg(long, default_value = "all")]
    pub platform: PlatformType,

    /// Image type: all, app, system, private, shared
    #[arg(long = "type", default_value = "all")]
    pub kind: BlueprintType,
}

#[derive(Debug, Clone, Args)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Image ID
    #[arg(long)]
    pub imageid: String,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Image ID; overrides --imageids
    #[arg(long, required_unless_present = "imageids")]
    pub imageid: Option<String>,

    /// Comma-separated image IDs
    #[arg(long)]
    pub imageids: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Image name
    #[arg(long)]
    pub name: Option<String>,

    /// Image description
    #[arg(long, default_value = "")]
    pub desc: String,
}

/// Execute `blueprint list`
pub fn execute_list(args: ListArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.account.connect(&*inv.env)?;
    let blueprints = driver.list_blueprints(&args.region, args.platform, args.kind)?;

    inv.console.say(&format::rule());
    inv.console
        .say(&format::row(&["Name", "Image ID", "OS", "Disk", "Memory", "State"]));
    inv.console.say(&format::rule());
    for bp in blueprints {
        inv.console.say(&format::row(&[
            bp.name,
            bp.id,
            bp.os_name,
            format!("{} GB", bp.required_disk_size),
            format!("{} GB", bp.required_memory),
            bp.state,
        ]));
    }
    inv.console.say(&format::rule());
    inv.console
        .say("Run 'lhbin image desc --region <region> --imageid <id>' for details");
    Ok(Completion::Done)
}

/// Execute `blueprint desc`
pub fn execute_describe(args: DescribeArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.account.connect(&*inv.env)?;
    let bp = driver.blueprint_info(&args.region, &args.imageid)?;

    inv.console.say(&format::rule());
    for (key, value) in [
        ("Name", bp.name.clone()),
        ("Image ID", bp.id.clone()),
        ("OS", bp.os_name.clone()),
        ("Minimum disk", format!("{} GB", bp.required_disk_size)),
        ("Minimum memory", format!("{} GB", bp.required_memory)),
        ("Description", bp.description.clone()),
    ] {
        inv.console.say(&format::row(&[key, value.as_str()]));
    }
    inv.console.say(&format::rule());
    Ok(Completion::Done)
}

/// Execute `blueprint del`
pub fn execute_delete(args: DeleteArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let targets = ids(&args.imageid, &args.imageids);
    if targets.is_empty() {
        return Err(LhError::invalid("--imageid or --imageids is required"));
    }
    let driver = args.account.connect(&*inv.env)?;
    batch::each_id(
        &mut *inv.console,
        "delete",
        "image",
        &args.region,
        &targets,
        |id| Ok(driver.delete_blueprints(&args.region, &[id.to_string()])?),
    );
    Ok(Completion::Done)
}

/// Execute `blueprint create`
pub fn execute_create(args: CreateArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let name = args.name.clone().unwrap_or_default();
    run_batch(
        inv,
        &args.targets,
        BatchOptions::new("create image from"),
        |_| require(&args.name, "--name").map(|_| ()),
        |driver, target, _| {
            driver.create_blueprint(&target.region, &target.instance_id, name.trim(), &args.desc)?;
            Ok(())
        },
    )
}
