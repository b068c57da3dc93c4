//! @acp:module "Key Pair Command"
//! @acp:summary "Create, import, delete, bind and unbind SSH key pairs"
//! @acp:domain cli
//! @acp:layer handler

use std::path::PathBuf;

use clap::Args;

use super::{ids, require, run_batch, AccountArgs, TargetArgs};
use crate::batch::{self, BatchOptions};
use crate::error::{LhError, Result};
use crate::format;
use crate::operation::{Action, Completion, Invocation, Operation};
use crate::registry::CommandRegistry;

pub const COMMAND: &str = "keypair";

pub fn register(registry: &mut CommandRegistry) {
    registry.register_command(COMMAND, "Manage key pairs", &["kp"]);
    registry.register_operator(
        COMMAND,
        "list",
        "List key pairs, in every region unless --region is given",
        &[],
        Operation::unconfirmed(Action::new(execute_list)),
    );
    registry.register_operator(
        COMMAND,
        "import",
        "Create a key pair from an existing public key",
        &[],
        Operation::unconfirmed(Action::new(execute_import)),
    );
    registry.register_operator(
        COMMAND,
        "create",
        "Create a new key pair",
        &[],
        Operation::unconfirmed(Action::new(execute_create)),
    );
    registry.register_operator(
        COMMAND,
        "del",
        "Delete key pairs",
        &["delete"],
        Operation::simple("", Action::new(execute_delete)),
    );
    registry.register_operator(
        COMMAND,
        "bind",
        "Bind a key pair to the selected instances",
        &[],
        Operation::simple(
            "Binding restarts the instances, save your application data first",
            Action::new(execute_bind),
        ),
    );
    registry.register_operator(
        COMMAND,
        "unbind",
        "Unbind a key pair from the selected instances",
        &[],
        Operation::simple(
            "Unbinding restarts the instances, save your application data first",
            Action::new(execute_unbind),
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
pub struct CreateArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Key pair name
    #[arg(long)]
    pub keyname: String,
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Key pair name
    #[arg(long)]
    pub keyname: String,

    /// Public key file
    #[arg(long, visible_alias = "pubKeyPath")]
    pub pubkey: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Region
    #[arg(long)]
    pub region: String,

    /// Key pair ID; overrides --keyids. Every key pair of the region when both are omitted
    #[arg(long)]
    pub keyid: Option<String>,

    /// Comma-separated key pair IDs
    #[arg(long)]
    pub keyids: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct BindArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Key pair ID
    #[arg(long)]
    pub keyid: Option<String>,
}

/// Execute `keypair list`
pub fn execute_list(args: ListArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.account.connect(&*inv.env)?;
    let regions = match args.region.as_deref().filter(|r| !r.is_empty()) {
        Some(region) => vec![region.to_string()],
        None => driver.list_regions()?.into_iter().map(|r| r.region).collect(),
    };

    let console = &mut *inv.console;
    console.say(&format::rule());
    console.say(&format::row(&["Region", "Name", "Key ID", "Bound instances", "Created"]));
    console.say(&format::rule());
    for region in &regions {
        match driver.list_key_pairs(region) {
            Ok(key_pairs) => {
                for kp in key_pairs {
                    console.say(&format::row(&[
                        region.clone(),
                        kp.name,
                        kp.id,
                        kp.associated_instance_ids.join(","),
                        format::timestamp(&kp.created_time),
                    ]));
                }
            }
            Err(e) => {
                tracing::warn!(region = %region, error = %e, "cannot list key pairs");
                console.warn(&format!("{}: cannot list key pairs: {}", region, e));
            }
        }
    }
    console.say(&format::rule());
    Ok(Completion::Done)
}

/// Execute `keypair create`
pub fn execute_create(args: CreateArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.account.connect(&*inv.env)?;
    let kp = driver.create_key_pair(&args.region, &args.keyname)?;

    inv.console.say(&format!(
        "Key pair {} ({}) created. The private key cannot be retrieved later, store it now.",
        kp.name, kp.id
    ));
    inv.console.say("Public key:");
    inv.console.say(&kp.public_key);
    inv.console.say("Private key:");
    inv.console.say(kp.private_key.as_deref().unwrap_or(""));
    Ok(Completion::Done)
}

/// Execute `keypair import`
pub fn execute_import(args: ImportArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let public_key = std::fs::read_to_string(&args.pubkey)?;
    let driver = args.account.connect(&*inv.env)?;
    let kp = driver.import_key_pair(&args.region, &args.keyname, public_key.trim())?;
    inv.console
        .say(&format!("Key pair {} ({}) imported", kp.name, kp.id));
    Ok(Completion::Done)
}

/// Execute `keypair del`
pub fn execute_delete(args: DeleteArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let driver = args.account.connect(&*inv.env)?;
    let mut targets = ids(&args.keyid, &args.keyids);
    if targets.is_empty() {
        targets = driver
            .list_key_pairs(&args.region)?
            .into_iter()
            .map(|kp| kp.id)
            .collect();
    }
    batch::each_id(
        &mut *inv.console,
        "delete",
        "key pair",
        &args.region,
        &targets,
        |id| Ok(driver.delete_key_pairs(&args.region, &[id.to_string()])?),
    );
    Ok(Completion::Done)
}

fn check_bind(args: &BindArgs) -> Result<()> {
    if args.targets.filter().region.is_none() {
        return Err(LhError::invalid("--region is required"));
    }
    require(&args.keyid, "--keyid")?;
    Ok(())
}

/// Execute `keypair bind`
pub fn execute_bind(args: BindArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let keyid = args.keyid.clone().unwrap_or_default();
    run_batch(
        inv,
        &args.targets,
        BatchOptions::new(&format!("bind key pair {} to", keyid.trim())),
        |_| check_bind(&args),
        |driver, target, _| {
            Ok(driver.bind_key_pairs(
                &target.region,
                &[keyid.trim().to_string()],
                &[target.instance_id.clone()],
            )?)
        },
    )
}

/// Execute `keypair unbind`
pub fn execute_unbind(args: BindArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let keyid = args.keyid.clone().unwrap_or_default();
    run_batch(
        inv,
        &args.targets,
        BatchOptions::new(&format!("unbind key pair {} from", keyid.trim())),
        |_| check_bind(&args),
        |driver, target, _| {
            Ok(driver.unbind_key_pairs(
                &target.region,
                &[keyid.trim().to_string()],
                &[target.instance_id.clone()],
            )?)
        },
    )
}
