//! @acp:module "Dispatcher"
//! @acp:summary "Maps process arguments to a help level or an operator invocation"
//! @acp:domain cli
//! @acp:layer handler
//!
//! Arguments are `<command> <operator> [flags]`, without the program name.
//! A help token left of a depth prints the help of that depth; unknown
//! tokens fall through to global help.

use clap::ArgMatches;
use console::style;

use crate::error::LhError;
use crate::operation::{Completion, Environment, Invocation, Mode};
use crate::registry::CommandRegistry;
use crate::terminal::Console;

/// Tokens that request help at any depth
pub const HELP_TOKENS: [&str; 3] = ["--help", "-help", "-h"];

pub(crate) fn is_help(token: &str) -> bool {
    HELP_TOKENS.contains(&token)
}

/// How a dispatch ended
#[derive(Debug)]
pub enum Dispatch {
    /// Help was printed instead of running anything
    Help,
    Completed(Completion),
    Failed(LhError),
}

impl Dispatch {
    /// Process exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Dispatch::Help | Dispatch::Completed(_) => 0,
            Dispatch::Failed(_) => 1,
        }
    }
}

/// Routes argument vectors through a registry
pub struct Dispatcher<'r> {
    registry: &'r CommandRegistry,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r CommandRegistry) -> Self {
        Self { registry }
    }

    pub fn dispatch(
        &self,
        args: &[String],
        console: &mut dyn Console,
        env: &mut Environment,
    ) -> Dispatch {
        let (command, operator) = match args {
            [] => {
                self.registry.help(console);
                return Dispatch::Help;
            }
            [command, ..] if is_help(command) => {
                self.registry.help(console);
                return Dispatch::Help;
            }
            [command] => {
                if !self.registry.help_command(console, command) {
                    self.unknown(console, command);
                }
                return Dispatch::Help;
            }
            [command, operator, ..] if is_help(operator) => {
                if !self.registry.help_command(console, command) {
                    self.unknown(console, command);
                }
                return Dispatch::Help;
            }
            [command, operator, ..] => (command.as_str(), operator.as_str()),
        };

        let Some(found) = self.registry.resolve(command, operator) else {
            let token = if self.registry.command(command).is_some() {
                format!("{} {}", command, operator)
            } else {
                command.to_string()
            };
            self.unknown(console, &token);
            return Dispatch::Help;
        };

        let flags = &args[2..];
        if found.operation.action().wants_help(flags) {
            let mut invocation = Invocation {
                matches: ArgMatches::default(),
                console: &mut *console,
                env: &mut *env,
            };
            return match self.registry.help_operator(&mut invocation, command, operator) {
                Ok(_) => Dispatch::Help,
                Err(e) => Dispatch::Failed(e),
            };
        }

        tracing::debug!(command, operator, ?flags, "dispatching");
        let result = found.operation.action().parse(flags).and_then(|matches| {
            let mut invocation = Invocation {
                matches,
                console: &mut *console,
                env: &mut *env,
            };
            found.operation.invoke(&mut invocation, Mode::Execute)
        });

        match result {
            Ok(Completion::Done) => {
                console.say(&format!("{} Done", style("✓").green()));
                Dispatch::Completed(Completion::Done)
            }
            Ok(cancelled @ Completion::Cancelled(_)) => Dispatch::Completed(cancelled),
            Err(e) => {
                tracing::debug!(error = %e, "invocation failed");
                console.say(&format!("{} Operation failed: {}", style("✗").red(), e));
                Dispatch::Failed(e)
            }
        }
    }

    fn unknown(&self, console: &mut dyn Console, token: &str) {
        console.warn(&format!("Unknown command: {}", token));
        self.registry.help(console);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountStore;
    use crate::driver::DriverCatalog;
    use crate::operation::{Action, NoFlags, Operation};
    use crate::terminal::ScriptedConsole;
    use clap::Args;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Args)]
    struct Named {
        #[arg(long)]
        name: String,
    }

    fn setup(counter: Rc<Cell<usize>>) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register_command("snapshot", "manage snapshots", &["ss"]);
        let c = counter.clone();
        registry.register_operator(
            "ss",
            "create",
            "create a snapshot",
            &[],
            Operation::simple(
                "",
                Action::new(move |args: Named, inv: &mut Invocation<'_>| {
                    c.set(c.get() + 1);
                    inv.console.say(&format!("created {}", args.name));
                    Ok(Completion::Done)
                }),
            ),
        );
        registry.register_operator(
            "ss",
            "fail",
            "always fails",
            &[],
            Operation::unconfirmed(Action::new(|_: NoFlags, _: &mut Invocation<'_>| {
                Err(LhError::Other("no capacity".to_string()))
            })),
        );
        registry
    }

    fn run(registry: &CommandRegistry, args: &[&str], answers: &[&str]) -> (Dispatch, ScriptedConsole) {
        let mut console = ScriptedConsole::with_answers(answers.iter().copied());
        let mut env = Environment::new(AccountStore::in_memory(vec![]), DriverCatalog::empty());
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let outcome = Dispatcher::new(registry).dispatch(&args, &mut console, &mut env);
        (outcome, console)
    }

    #[test]
    fn test_help_levels() {
        let counter = Rc::new(Cell::new(0));
        let registry = setup(counter.clone());

        let (outcome, console) = run(&registry, &[], &[]);
        assert!(matches!(outcome, Dispatch::Help));
        assert!(console.contains("Commands:"));

        let (_, console) = run(&registry, &["ss"], &[]);
        assert!(console.contains("Operators:"));

        let (_, console) = run(&registry, &["ss", "-help"], &[]);
        assert!(console.contains("Operators:"));

        let (outcome, console) = run(&registry, &["ss", "create", "--name", "x", "--help"], &[]);
        assert_eq!(outcome.exit_code(), 0);
        assert!(console.contains("--name"));
        assert_eq!(console.prompts, 0);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_unknown_tokens_print_global_help() {
        let registry = setup(Rc::new(Cell::new(0)));
        let (outcome, console) = run(&registry, &["disk", "list"], &[]);
        assert!(matches!(outcome, Dispatch::Help));
        assert!(console.contains("Unknown command: disk"));
        assert!(console.contains("Commands:"));

        let (_, console) = run(&registry, &["ss", "explode"], &[]);
        assert!(console.contains("Unknown command: ss explode"));
    }

    #[test]
    fn test_flags_are_parsed_before_confirmation() {
        let counter = Rc::new(Cell::new(0));
        let registry = setup(counter.clone());
        let (outcome, console) = run(&registry, &["ss", "create"], &["y"]);
        assert!(matches!(outcome, Dispatch::Failed(LhError::Validation(_))));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(console.prompts, 0);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_confirmed_invocation_runs_once() {
        let counter = Rc::new(Cell::new(0));
        let registry = setup(counter.clone());
        let (outcome, console) = run(&registry, &["ss", "create", "--name", "nightly"], &["y"]);
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert_eq!(counter.get(), 1);
        assert!(console.contains("created nightly"));
        assert!(console.contains("Done"));
    }

    #[test]
    fn test_declined_invocation_exits_cleanly() {
        let counter = Rc::new(Cell::new(0));
        let registry = setup(counter.clone());
        let (outcome, console) = run(&registry, &["ss", "create", "--name", "nightly"], &["n"]);
        assert!(matches!(outcome, Dispatch::Completed(Completion::Cancelled(_))));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(counter.get(), 0);
        assert!(!console.contains("Done"));
    }

    #[test]
    fn test_failed_invocation_reports_reason() {
        let registry = setup(Rc::new(Cell::new(0)));
        let (outcome, console) = run(&registry, &["ss", "fail"], &[]);
        assert_eq!(outcome.exit_code(), 1);
        assert!(console.contains("Operation failed: no capacity"));
    }
}
