//! @acp:module "Instance Command"
//! @acp:summary "List, describe and change the power state of instances"
//! @acp:domain cli
//! @acp:layer handler

use clap::Args;

use super::{no_check, require, run_batch, AccountArgs, TargetArgs};
use crate::batch::BatchOptions;
use crate::error::Result;
use crate::format;
use crate::operation::{Action, Completion, Invocation, Operation};
use crate::registry::CommandRegistry;

pub const COMMAND: &str = "ins";

pub fn register(registry: &mut CommandRegistry) {
    registry.register_command(COMMAND, "Manage instances", &["instance"]);
    registry.register_operator(
        COMMAND,
        "list",
        "List instances, in every region unless --region is given",
        &[],
        Operation::unconfirmed(Action::new(execute_list)),
    );
    registry.register_operator(
        COMMAND,
        "desc",
        "Show instance details",
        &["describe"],
        Operation::unconfirmed(Action::new(execute_describe)),
    );
    registry.register_operator(
        COMMAND,
        "start",
        "Start instances",
        &[],
        Operation::unconfirmed(Action::new(execute_start)),
    );
    registry.register_operator(
        COMMAND,
        "stop",
        "Stop instances",
        &[],
        Operation::simple("Make sure your work is saved", Action::new(execute_stop)),
    );
    registry.register_operator(
        COMMAND,
        "restart",
        "Restart instances",
        &["reboot"],
        Operation::simple("Make sure your work is saved", Action::new(execute_restart)),
    );
    registry.register_operator(
        COMMAND,
        "reset",
        "Reinstall instances from an image",
        &[],
        Operation::token(
            "A reset instance cannot be restored, back up your data first",
            Action::new(execute_reset),
        ),
    );
    registry.register_operator(
        COMMAND,
        "terminate",
        "Destroy instances",
        &["destroy", "destory"],
        Operation::token(
            "A destroyed instance cannot be restored, back up your data first. Refunds follow the provider's policy",
            Action::new(execute_terminate),
        ),
    );
    registry.register_operator(
        COMMAND,
        "passwd",
        "Reset the login password of instances",
        &[],
        Operation::simple(
            "Running instances are shut down to reset the password",
            Action::new(execute_passwd),
        ),
    );
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region; every region when omitted
    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ResetArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Image to reinstall from, see `lhbin image list`
    #[arg(long)]
    pub imageid: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PasswdArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Login user name
    #[arg(long)]
    pub username: Option<String>,

    /// New password
    #[arg(long, allow_hyphen_values = true)]
    pub password: Option<String>,
}

/// Execute `ins list`
pub fn execute_list(args: ListArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.account.connect(&*inv.env)?;
    let regions = match args.region.as_deref().filter(|r| !r.is_empty()) {
        Some(region) => vec![region.to_string()],
        None => driver.list_regions()?.into_iter().map(|r| r.region).collect(),
    };

    let console = &mut *inv.console;
    console.say(&format::rule());
    console.say(&format::row(&["Region", "Name", "ID", "Public IP", "Private IP", "State"]));
    console.say(&format::rule());
    for region in &regions {
        match driver.list_instances(region) {
            Ok(instances) => {
                for ins in instances {
                    console.say(&format::row(&[
                        region.as_str(),
                        ins.name.as_str(),
                        ins.id.as_str(),
                        ins.public_ip.as_str(),
                        ins.private_ip.as_str(),
                        ins.state.to_string().as_str(),
                    ]));
                }
            }
            Err(e) => {
                tracing::warn!(region = %region, error = %e, "cannot list instances");
                console.warn(&format!("{}: cannot list instances: {}", region, e));
            }
        }
    }
    console.say(&format::rule());
    console.say("Run 'lhbin ins desc --region <region> --insids <id,...>' for details");
    Ok(Completion::Done)
}

/// Execute `ins desc`
pub fn execute_describe(args: TargetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    run_batch(
        inv,
        &args,
        BatchOptions::new("describe")
            .without_breadth_confirm()
            .quiet_success(),
        no_check,
        |driver, target, console| {
            let ins = driver.instance_info(&target.region, &target.instance_id)?;
            let expired = ins
                .expired_time
                .as_ref()
                .map(format::timestamp)
                .unwrap_or_else(|| "-".to_string());
            console.say(&format::rule());
            for (key, value) in [
                ("Region", ins.region.clone()),
                ("ID", ins.id.clone()),
                ("Name", ins.name.clone()),
                ("Zone", ins.zone.clone()),
                ("Public IP", ins.public_ip.clone()),
                ("Private IP", ins.private_ip.clone()),
                ("Bandwidth", format!("{} Mbit/s", ins.bandwidth)),
                ("CPU", format!("{} cores", ins.cpu)),
                ("Memory", format!("{} GB", ins.memory)),
                ("Disk", format!("{} GB", ins.disk)),
                ("OS", ins.os_name.clone()),
                ("State", ins.state.to_string()),
                ("Created", format::timestamp(&ins.created_time)),
                ("Expires", expired),
            ] {
                console.say(&format::row(&[key, value.as_str()]));
            }
            console.say(&format::rule());
            Ok(())
        },
    )
}

/// Execute `ins start`
pub fn execute_start(args: TargetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    run_batch(inv, &args, BatchOptions::new("start"), no_check, |driver, target, _| {
        Ok(driver.start_instances(&target.region, &[target.instance_id.clone()])?)
    })
}

/// Execute `ins stop`
pub fn execute_stop(args: TargetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    run_batch(inv, &args, BatchOptions::new("stop"), no_check, |driver, target, _| {
        Ok(driver.stop_instances(&target.region, &[target.instance_id.clone()])?)
    })
}

/// Execute `ins restart`
pub fn execute_restart(args: TargetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    run_batch(inv, &args, BatchOptions::new("restart"), no_check, |driver, target, _| {
        Ok(driver.restart_instances(&target.region, &[target.instance_id.clone()])?)
    })
}

/// Execute `ins terminate`
pub fn execute_terminate(args: TargetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    run_batch(inv, &args, BatchOptions::new("terminate"), no_check, |driver, target, _| {
        Ok(driver.terminate_instances(&target.region, &[target.instance_id.clone()])?)
    })
}

/// Execute `ins reset`
pub fn execute_reset(args: ResetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let image = args.imageid.clone().unwrap_or_default();
    run_batch(
        inv,
        &args.targets,
        BatchOptions::new("reset"),
        |_| require(&args.imageid, "--imageid (see 'lhbin image list')").map(|_| ()),
        |driver, target, _| {
            Ok(driver.reset_instances(&target.region, &[target.instance_id.clone()], image.trim())?)
        },
    )
}

/// Execute `ins passwd`
pub fn execute_passwd(args: PasswdArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let username = args.username.clone().unwrap_or_default();
    let password = args.password.clone().unwrap_or_default();
    run_batch(
        inv,
        &args.targets,
        BatchOptions::new("reset password of"),
        |_| {
            require(&args.username, "--username")?;
            require(&args.password, "--password")?;
            Ok(())
        },
        |driver, target, _| {
            Ok(driver.reset_password(
                &target.region,
                &[target.instance_id.clone()],
                &username,
                &password,
            )?)
        },
    )
}
