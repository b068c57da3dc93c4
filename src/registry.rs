//! @acp:module "Command Registry"
//! @acp:summary "Command and operator tables with alias resolution and nested help"
//! @acp:domain cli
//! @acp:layer service
//!
//! The registry is built once at startup and then only read. Commands and
//! operators keep their registration order, which is the order help lists
//! them in.

use std::collections::HashMap;

use console::style;

use crate::error::Result;
use crate::operation::{Invocation, Mode, Operation};
use crate::terminal::Console;

/// Program name used in usage lines
pub const PROGRAM: &str = "lhbin";

/// An operator of a command, bound to its operation
pub struct Operator {
    pub name: String,
    pub help: String,
    pub aliases: Vec<String>,
    pub operation: Operation,
}

/// A top-level command and its operators
pub struct Command {
    pub name: String,
    pub help: String,
    pub aliases: Vec<String>,
    operators: Vec<Operator>,
    /// Operator name or alias -> index into `operators`
    operator_index: HashMap<String, usize>,
}

impl Command {
    fn new(name: &str, help: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            operators: Vec::new(),
            operator_index: HashMap::new(),
        }
    }

    /// Operators in registration order
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Look up an operator by name or alias
    pub fn operator(&self, token: &str) -> Option<&Operator> {
        self.operator_index.get(token).map(|&i| &self.operators[i])
    }

    fn insert(&mut self, operator: Operator) {
        let slot = match self.operators.iter().position(|o| o.name == operator.name) {
            Some(i) => {
                self.operators[i] = operator;
                i
            }
            None => {
                self.operators.push(operator);
                self.operators.len() - 1
            }
        };
        let operator = &self.operators[slot];
        self.operator_index.insert(operator.name.clone(), slot);
        for alias in &operator.aliases {
            self.operator_index.insert(alias.clone(), slot);
        }
    }
}

/// All commands known to the process
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
    /// Command name or alias -> canonical command name
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a command.
    ///
    /// Registering an existing name replaces that command. Aliases that
    /// collide with an earlier command are taken over by this one.
    pub fn register_command(&mut self, name: &str, help: &str, aliases: &[&str]) {
        let command = Command::new(name, help, aliases);
        match self.commands.iter().position(|c| c.name == name) {
            Some(i) => self.commands[i] = command,
            None => self.commands.push(command),
        }
        self.aliases.insert(name.to_string(), name.to_string());
        for alias in aliases {
            self.aliases.insert(alias.to_string(), name.to_string());
        }
    }

    /// Attach an operator to the command `command` names or aliases.
    ///
    /// Returns `false`, and drops the operator, when `command` resolves to
    /// no command.
    pub fn register_operator(
        &mut self,
        command: &str,
        name: &str,
        help: &str,
        aliases: &[&str],
        mut operation: Operation,
    ) -> bool {
        let Some(canonical) = self.aliases.get(command).cloned() else {
            tracing::warn!(command, operator = name, "dropping operator of unknown command");
            return false;
        };
        let Some(target) = self.commands.iter_mut().find(|c| c.name == canonical) else {
            tracing::warn!(command, operator = name, "dropping operator of unknown command");
            return false;
        };
        operation
            .action_mut()
            .set_path(&format!("{} {} {}", PROGRAM, canonical, name));
        target.insert(Operator {
            name: name.to_string(),
            help: help.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            operation,
        });
        true
    }

    /// Commands in registration order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Look up a command by name or alias
    pub fn command(&self, token: &str) -> Option<&Command> {
        let canonical = self.aliases.get(token)?;
        self.commands.iter().find(|c| &c.name == canonical)
    }

    /// Two-stage lookup: command alias first, then operator alias
    pub fn resolve(&self, command: &str, operator: &str) -> Option<&Operator> {
        self.command(command)?.operator(operator)
    }

    /// Usage line plus every command with its aliases
    pub fn help(&self, console: &mut dyn Console) {
        console.say(&format!(
            "{} {} <command> <operator> [flags]",
            style("Usage:").bold(),
            PROGRAM
        ));
        console.say("");
        console.say(&style("Commands:").bold().to_string());
        for command in &self.commands {
            console.say(&entry(&command.name, &command.aliases, &command.help));
        }
        console.say("");
        console.say(&format!(
            "Run '{} <command> --help' to list the operators of a command.",
            PROGRAM
        ));
    }

    /// Help for one command, listing its operators. Returns `false` when the
    /// token names no command.
    pub fn help_command(&self, console: &mut dyn Console, command: &str) -> bool {
        let Some(command) = self.command(command) else {
            return false;
        };
        console.say(&format!(
            "{} {} {} <operator> [flags]",
            style("Usage:").bold(),
            PROGRAM,
            command.name
        ));
        if !command.help.is_empty() {
            console.say(&command.help);
        }
        console.say("");
        console.say(&style("Operators:").bold().to_string());
        for operator in &command.operators {
            let mut help = operator.help.clone();
            if !matches!(operator.operation, Operation::Unconfirmed(_)) {
                help = format!("{} [{}]", help, operator.operation.tier());
            }
            console.say(&entry(&operator.name, &operator.aliases, &help));
        }
        console.say("");
        console.say(&format!(
            "Run '{} {} <operator> --help' for the flags of an operator.",
            PROGRAM, command.name
        ));
        true
    }

    /// Help for one operator, rendered by invoking its operation in help
    /// mode. Returns `false` when the tokens name no operator.
    pub fn help_operator(
        &self,
        inv: &mut Invocation<'_>,
        command: &str,
        operator: &str,
    ) -> Result<bool> {
        let Some(found) = self.resolve(command, operator) else {
            return Ok(false);
        };
        if !found.help.is_empty() {
            inv.console.say(&found.help);
        }
        if !found.aliases.is_empty() {
            inv.console
                .say(&format!("Aliases: {}", found.aliases.join(", ")));
        }
        found.operation.invoke(inv, Mode::Help)?;
        Ok(true)
    }
}

fn entry(name: &str, aliases: &[String], help: &str) -> String {
    let label = if aliases.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, aliases.join(", "))
    };
    format!("  {:<28} {}", label, help)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountStore;
    use crate::driver::DriverCatalog;
    use crate::operation::{Action, Completion, Environment, NoFlags};
    use crate::terminal::ScriptedConsole;
    use clap::ArgMatches;

    fn noop() -> Action {
        Action::new(|_: NoFlags, _: &mut Invocation<'_>| Ok(Completion::Done))
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register_command("ins", "manage instances", &["instance", "vm"]);
        registry.register_operator("instance", "restart", "restart instances", &["reboot"], {
            Operation::simple("", noop())
        });
        registry.register_operator("ins", "list", "list instances", &[], Operation::unconfirmed(noop()));
        registry
    }

    #[test]
    fn test_aliases_resolve_to_the_same_operator() {
        let registry = registry();
        let canonical = registry.resolve("ins", "restart").unwrap();
        for (command, operator) in [("instance", "reboot"), ("vm", "restart"), ("vm", "reboot")] {
            let via_alias = registry.resolve(command, operator).unwrap();
            assert!(std::ptr::eq(canonical, via_alias), "{} {}", command, operator);
            assert!(std::ptr::eq(&canonical.operation, &via_alias.operation));
        }
    }

    #[test]
    fn test_unknown_tokens_do_not_resolve() {
        let registry = registry();
        assert!(registry.resolve("disk", "list").is_none());
        assert!(registry.resolve("ins", "explode").is_none());
        assert!(registry.command("disk").is_none());
    }

    #[test]
    fn test_operator_for_unknown_command_is_dropped() {
        let mut registry = registry();
        let accepted =
            registry.register_operator("disk", "list", "", &[], Operation::unconfirmed(noop()));
        assert!(!accepted);
        assert!(registry.command("disk").is_none());
    }

    #[test]
    fn test_reregistering_command_replaces_it() {
        let mut registry = registry();
        registry.register_command("ins", "instances again", &["server"]);
        assert_eq!(registry.commands().len(), 1);
        let command = registry.command("server").unwrap();
        assert_eq!(command.help, "instances again");
        assert!(command.operators().is_empty());
    }

    #[test]
    fn test_colliding_alias_last_registration_wins() {
        let mut registry = registry();
        registry.register_command("volume", "manage volumes", &["vm"]);
        assert_eq!(registry.command("vm").unwrap().name, "volume");
        assert_eq!(registry.command("instance").unwrap().name, "ins");
    }

    #[test]
    fn test_operators_keep_registration_order() {
        let registry = registry();
        let names: Vec<&str> = registry
            .command("ins")
            .unwrap()
            .operators()
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["restart", "list"]);
    }

    #[test]
    fn test_command_help_lists_operators_and_tiers() {
        let registry = registry();
        let mut console = ScriptedConsole::new();
        assert!(registry.help_command(&mut console, "vm"));
        assert!(console.contains("restart (reboot)"));
        assert!(console.contains("[requires confirmation]"));
        assert!(!registry.help_command(&mut console, "disk"));
    }

    #[test]
    fn test_operator_help_uses_full_path() {
        let registry = registry();
        let mut console = ScriptedConsole::new();
        let mut env = Environment::new(AccountStore::in_memory(vec![]), DriverCatalog::empty());
        let mut inv = Invocation {
            matches: ArgMatches::default(),
            console: &mut console,
            env: &mut env,
        };
        assert!(registry.help_operator(&mut inv, "vm", "reboot").unwrap());
        assert!(!registry.help_operator(&mut inv, "vm", "explode").unwrap());
        assert!(console.contains("lhbin ins restart"));
        assert!(console.contains("Aliases: reboot"));
        assert_eq!(console.prompts, 0);
    }
}
