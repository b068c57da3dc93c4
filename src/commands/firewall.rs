//! @acp:module "Firewall Command"
//! @acp:summary "List, add, delete and replace instance firewall rules"
//! @acp:domain cli
//! @acp:layer handler
//!
//! Rules are written as `protocol|port[|cidr[|action[|description]]]`, for
//! example `TCP|8080-8090|0.0.0.0/0|ACCEPT|test` or just `TCP|8080-8090`.

use std::sync::LazyLock;

use clap::Args;
use regex::Regex;

use super::{no_check, run_batch, TargetArgs};
use crate::batch::BatchOptions;
use crate::driver::{FirewallRule, RuleAction, RuleProtocol};
use crate::error::{LhError, Result};
use crate::format;
use crate::operation::{ask_yes, read_answer, Action, Completion, Invocation, Operation};
use crate::registry::CommandRegistry;
use crate::terminal::Console;

pub const COMMAND: &str = "firewall";

/// `ALL`, `22`, `80,443` or `8000-9000`
static PORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:all)$|^\d+(?:,\d+)*$|^(\d+)-(\d+)$").unwrap());

const DEFAULT_CIDR: &str = "0.0.0.0/0";

pub fn register(registry: &mut CommandRegistry) {
    registry.register_command(COMMAND, "Manage instance firewalls", &["iptable"]);
    registry.register_operator(
        COMMAND,
        "list",
        "List firewall rules of the selected instances",
        &[],
        Operation::unconfirmed(Action::new(execute_list)),
    );
    registry.register_operator(
        COMMAND,
        "del",
        "Delete a firewall rule from the selected instances",
        &["delete"],
        Operation::unconfirmed(Action::new(execute_delete)),
    );
    registry.register_operator(
        COMMAND,
        "add",
        "Add a firewall rule to the selected instances",
        &["create"],
        Operation::unconfirmed(Action::new(execute_add)),
    );
    registry.register_operator(
        COMMAND,
        "update",
        "Replace every firewall rule of the selected instances",
        &["reset"],
        Operation::simple(
            "All existing firewall rules are removed",
            Action::new(execute_update),
        ),
    );
}

#[derive(Debug, Clone, Args)]
pub struct RuleArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Rule as protocol|port[|cidr[|action[|description]]]; prompted when omitted
    #[arg(long)]
    pub rule: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Include the standard rules (ping, 22, 3389, 80, 443)
    #[arg(long)]
    pub defaults: bool,

    /// Rule as protocol|port[|cidr[|action[|description]]]; repeatable
    #[arg(long)]
    pub rule: Vec<String>,
}

/// Parse one rule in `protocol|port[|cidr[|action[|description]]]` form
pub fn parse_rule(text: &str) -> Result<FirewallRule> {
    let fields: Vec<&str> = text.trim().split('|').map(str::trim).collect();
    if fields.len() < 2 || fields[1].is_empty() {
        return Err(LhError::invalid(format!(
            "firewall rule '{}' needs at least a protocol and a port",
            text.trim()
        )));
    }
    let protocol: RuleProtocol = fields[0].parse().map_err(LhError::invalid)?;
    let port = parse_port(fields[1])?;
    let cidr_block = match fields.get(2) {
        Some(cidr) if !cidr.is_empty() => cidr.to_string(),
        _ => DEFAULT_CIDR.to_string(),
    };
    let action = match fields.get(3) {
        Some(action) if !action.is_empty() => action.parse().map_err(LhError::invalid)?,
        _ => RuleAction::Accept,
    };
    let description = fields.get(4).map(|d| d.to_string()).unwrap_or_default();

    Ok(FirewallRule {
        protocol,
        port,
        cidr_block,
        action,
        description,
    })
}

fn parse_port(port: &str) -> Result<String> {
    let invalid = || {
        LhError::invalid(format!(
            "invalid port '{}' (expected ALL, a port, a comma list or a range within 1-65535)",
            port
        ))
    };
    let caps = PORT_PATTERN.captures(port).ok_or_else(invalid)?;
    if port.eq_ignore_ascii_case("all") {
        return Ok("ALL".to_string());
    }
    let in_range = |n: &str| matches!(n.parse::<u32>(), Ok(1..=65535));
    match (caps.get(1), caps.get(2)) {
        (Some(start), Some(end)) => {
            let (s, e) = (start.as_str(), end.as_str());
            if !in_range(s) || !in_range(e) || s.parse::<u32>().ok() > e.parse::<u32>().ok() {
                return Err(invalid());
            }
        }
        _ => {
            if !port.split(',').all(in_range) {
                return Err(invalid());
            }
        }
    }
    Ok(port.to_string())
}

/// Standard rule set: ping, SSH, remote desktop, HTTP and HTTPS
pub fn default_rules() -> Vec<FirewallRule> {
    let rule = |protocol, port: &str, description: &str| FirewallRule {
        protocol,
        port: port.to_string(),
        cidr_block: DEFAULT_CIDR.to_string(),
        action: RuleAction::Accept,
        description: description.to_string(),
    };
    vec![
        rule(RuleProtocol::Icmp, "ALL", "Allow ping"),
        rule(RuleProtocol::Tcp, "22", "Allow Linux SSH login"),
        rule(RuleProtocol::Tcp, "3389", "Allow Windows remote desktop"),
        rule(RuleProtocol::Tcp, "80", "Allow HTTP (80) web services"),
        rule(RuleProtocol::Tcp, "443", "Allow HTTPS (443) web services"),
    ]
}

fn print_rule_format(console: &mut dyn Console) {
    console.say("Firewall rules are written as protocol|port|cidr|action|description");
    console.say("  protocol: TCP, UDP, ICMP or ALL");
    console.say("  port: ALL, a port, ports separated by commas, or start-end, within 1-65535");
    console.say("  cidr: an IP or a CIDR block, defaults to 0.0.0.0/0");
    console.say("  action: ACCEPT or DROP, defaults to ACCEPT");
    console.say("  description: optional, leave empty when deleting");
    console.say("Example: TCP|8080-8090|0.0.0.0/0|ACCEPT|test or TCP|8080-8090");
}

/// The `--rule` value, or one rule read from the console
fn rule_from_flag_or_prompt(
    rule: &Option<String>,
    console: &mut dyn Console,
    prompt: &str,
) -> Result<FirewallRule> {
    match rule {
        Some(text) => parse_rule(text),
        None => {
            print_rule_format(console);
            let text = read_answer(console, prompt)?;
            parse_rule(&text)
        }
    }
}

fn rule_row(rule: &FirewallRule) -> String {
    format::row(&[
        rule.protocol.to_string(),
        rule.port.clone(),
        rule.cidr_block.clone(),
        rule.action.to_string(),
        rule.description.clone(),
    ])
}

/// Execute `firewall list`
pub fn execute_list(args: TargetArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    run_batch(
        inv,
        &args,
        BatchOptions::new("list firewall of")
            .without_breadth_confirm()
            .quiet_success(),
        no_check,
        |driver, target, console| {
            let rules = driver.list_firewall_rules(&target.region, &target.instance_id)?;
            console.say(&format::rule());
            console.say(&format::row(&[
                target.region.as_str(),
                target.name.as_str(),
                target.instance_id.as_str(),
            ]));
            console.say(&format::rule());
            console.say(&format::row(&["Protocol", "Port", "Source", "Action", "Description"]));
            console.say(&format::rule());
            for rule in &rules {
                console.say(&rule_row(rule));
            }
            console.say("");
            Ok(())
        },
    )
}

/// Execute `firewall add`
pub fn execute_add(args: RuleArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let rule = rule_from_flag_or_prompt(&args.rule, &mut *inv.console, "Rule to add: ")?;
    run_batch(
        inv,
        &args.targets,
        BatchOptions::new("add firewall rule to"),
        no_check,
        |driver, target, _| {
            Ok(driver.add_firewall_rules(
                &target.region,
                &target.instance_id,
                std::slice::from_ref(&rule),
            )?)
        },
    )
}

/// Execute `firewall del`
pub fn execute_delete(args: RuleArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let rule = rule_from_flag_or_prompt(&args.rule, &mut *inv.console, "Rule to delete: ")?;
    run_batch(
        inv,
        &args.targets,
        BatchOptions::new("delete firewall rule from"),
        no_check,
        |driver, target, _| {
            Ok(driver.delete_firewall_rules(
                &target.region,
                &target.instance_id,
                std::slice::from_ref(&rule),
            )?)
        },
    )
}

/// Rules entered interactively until the operator stops
fn prompt_rules(console: &mut dyn Console) -> Result<Vec<FirewallRule>> {
    print_rule_format(console);
    let mut rules = Vec::new();
    if ask_yes(
        console,
        "Add the standard rules (ping, 22, 3389, 80, 443)? (Y/N): ",
    )? {
        rules.extend(default_rules());
    }
    while ask_yes(console, "Enter another rule? (Y/N): ")? {
        let text = read_answer(console, "Rule to add: ")?;
        match parse_rule(&text) {
            Ok(rule) => rules.push(rule),
            Err(e) => console.warn(&format!("Rule ignored: {}", e)),
        }
    }
    Ok(rules)
}

/// Execute `firewall update`
pub fn execute_update(args: UpdateArgs, inv: &mut Invocation<'_>) -> Result<Completion> {
    let rules = if args.defaults || !args.rule.is_empty() {
        let mut rules = if args.defaults {
            default_rules()
        } else {
            Vec::new()
        };
        for text in &args.rule {
            rules.push(parse_rule(text)?);
        }
        rules
    } else {
        prompt_rules(&mut *inv.console)?
    };
    tracing::debug!(rules = rules.len(), "replacing firewall rules");

    run_batch(
        inv,
        &args.targets,
        BatchOptions::new("update firewall of"),
        no_check,
        |driver, target, _| {
            Ok(driver.update_firewall_rules(&target.region, &target.instance_id, &rules)?)
        },
    )
}
