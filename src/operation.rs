//! @acp:module "Operations"
//! @acp:summary "Risk-tiered confirmation wrapper around operator actions"
//! @acp:domain cli
//! @acp:layer service
//!
//! An [`Operation`] pairs an [`Action`] (typed flags plus a callback) with
//! one of three confirmation tiers:
//!
//! - [`Operation::Unconfirmed`] runs immediately
//! - [`Operation::SimpleConfirm`] requires the operator to answer `y`
//! - [`Operation::TokenConfirm`] requires retyping a freshly issued token
//!
//! In help mode no tier prompts and no action runs; only the risk tip is
//! rendered.

use std::fmt;
use std::io;

use clap::{ArgMatches, Args, FromArgMatches};
use uuid::Uuid;

use crate::config::AccountStore;
use crate::dispatch::is_help;
use crate::driver::{Driver, DriverCatalog};
use crate::error::{LhError, Result};
use crate::terminal::Console;

/// Length of confirmation tokens
pub const TOKEN_LEN: usize = 5;

/// Issue a short random confirmation token
pub fn random_token() -> String {
    Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_string()
}

/// How an invocation finished, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    Cancelled(Cancellation),
}

/// Why an invocation was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation {
    /// Answered something other than `y`
    Declined,
    /// Retyped the confirmation token wrongly
    WrongToken,
    /// Declined the wide-selection warning of a batch
    BreadthDeclined,
}

impl fmt::Display for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cancellation::Declined => "Operation cancelled",
            Cancellation::WrongToken => "Wrong token, operation cancelled",
            Cancellation::BreadthDeclined => "Batch cancelled",
        })
    }
}

/// Whether an operation executes or only renders help
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Execute,
    Help,
}

/// Process-wide collaborators available to operator actions
pub struct Environment {
    pub accounts: AccountStore,
    pub drivers: DriverCatalog,
    tokens: Box<dyn FnMut() -> String>,
}

impl Environment {
    pub fn new(accounts: AccountStore, drivers: DriverCatalog) -> Self {
        Self {
            accounts,
            drivers,
            tokens: Box::new(random_token),
        }
    }

    /// Replace the confirmation token source
    pub fn with_token_source<F>(mut self, source: F) -> Self
    where
        F: FnMut() -> String + 'static,
    {
        self.tokens = Box::new(source);
        self
    }

    /// Build the driver for a driver/account selection
    pub fn connect(&self, driver: &str, account: &str) -> Result<Box<dyn Driver>> {
        let account = self.accounts.find(driver, account)?;
        self.drivers.open(account)
    }
}

/// One operator call: parsed flags plus the console and environment
pub struct Invocation<'a> {
    pub matches: ArgMatches,
    pub console: &'a mut dyn Console,
    pub env: &'a mut Environment,
}

type Callback = Box<dyn Fn(&mut Invocation<'_>) -> Result<Completion>>;

/// Typed operator flags bound to the callback consuming them
pub struct Action {
    flags: clap::Command,
    run: Callback,
}

impl Action {
    /// Action whose flags are declared by the `clap::Args` struct `A`
    pub fn new<A, F>(run: F) -> Self
    where
        A: Args + FromArgMatches + 'static,
        F: Fn(A, &mut Invocation<'_>) -> Result<Completion> + 'static,
    {
        let flags = A::augment_args(
            clap::Command::new("lhbin")
                .no_binary_name(true)
                .disable_help_flag(true)
                .disable_version_flag(true),
        );
        Self {
            flags,
            run: Box::new(move |inv: &mut Invocation<'_>| {
                let args = A::from_arg_matches(&inv.matches)
                    .map_err(|e| LhError::invalid(e.to_string().trim().to_string()))?;
                run(args, inv)
            }),
        }
    }

    /// Parse an operator's flag tail. Failures are validation errors.
    pub fn parse(&self, argv: &[String]) -> Result<ArgMatches> {
        self.flags
            .clone()
            .try_get_matches_from(argv)
            .map_err(|e| LhError::invalid(e.to_string().trim().to_string()))
    }

    /// Set the command path shown in the usage line, e.g. "lhbin ins stop"
    pub(crate) fn set_path(&mut self, path: &str) {
        self.flags = self.flags.clone().bin_name(path.to_string());
    }

    /// Whether a help token appears in flag position of `argv`. A help
    /// token consumed as the value of the preceding flag does not count.
    pub fn wants_help(&self, argv: &[String]) -> bool {
        let mut value_expected = false;
        for token in argv {
            if value_expected {
                value_expected = false;
                continue;
            }
            if is_help(token) {
                return true;
            }
            value_expected = self.takes_value(token);
        }
        false
    }

    fn takes_value(&self, token: &str) -> bool {
        if token.contains('=') {
            return false;
        }
        let arg = if let Some(long) = token.strip_prefix("--") {
            self.flags.get_arguments().find(|a| {
                a.get_long() == Some(long)
                    || a.get_all_aliases()
                        .is_some_and(|aliases| aliases.contains(&long))
            })
        } else if let Some(short) = token.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.flags.get_arguments().find(|a| a.get_short() == Some(c)),
                _ => None,
            }
        } else {
            None
        };
        arg.is_some_and(|a| a.get_action().takes_values())
    }

    /// clap-rendered usage and flag list
    pub fn usage(&self) -> String {
        self.flags.clone().render_help().to_string()
    }

    fn call(&self, inv: &mut Invocation<'_>) -> Result<Completion> {
        (self.run)(inv)
    }
}

/// An action wrapped in its confirmation tier
pub enum Operation {
    Unconfirmed(Action),
    SimpleConfirm { tip: Option<String>, action: Action },
    TokenConfirm { tip: Option<String>, action: Action },
}

fn non_empty(tip: &str) -> Option<String> {
    if tip.is_empty() {
        None
    } else {
        Some(tip.to_string())
    }
}

impl Operation {
    pub fn unconfirmed(action: Action) -> Self {
        Operation::Unconfirmed(action)
    }

    /// Single `y` confirmation; an empty tip shows no tip line
    pub fn simple(tip: &str, action: Action) -> Self {
        Operation::SimpleConfirm {
            tip: non_empty(tip),
            action,
        }
    }

    /// Token confirmation; an empty tip shows no tip line
    pub fn token(tip: &str, action: Action) -> Self {
        Operation::TokenConfirm {
            tip: non_empty(tip),
            action,
        }
    }

    pub fn action(&self) -> &Action {
        match self {
            Operation::Unconfirmed(action)
            | Operation::SimpleConfirm { action, .. }
            | Operation::TokenConfirm { action, .. } => action,
        }
    }

    pub(crate) fn action_mut(&mut self) -> &mut Action {
        match self {
            Operation::Unconfirmed(action)
            | Operation::SimpleConfirm { action, .. }
            | Operation::TokenConfirm { action, .. } => action,
        }
    }

    pub fn tip(&self) -> Option<&str> {
        match self {
            Operation::Unconfirmed(_) => None,
            Operation::SimpleConfirm { tip, .. } | Operation::TokenConfirm { tip, .. } => {
                tip.as_deref()
            }
        }
    }

    /// Short tier label for help output
    pub fn tier(&self) -> &'static str {
        match self {
            Operation::Unconfirmed(_) => "no confirmation",
            Operation::SimpleConfirm { .. } => "requires confirmation",
            Operation::TokenConfirm { .. } => "requires token confirmation",
        }
    }

    /// Run the confirmation dialogue. `None` means the operator confirmed.
    pub fn confirm(
        &self,
        console: &mut dyn Console,
        issue_token: &mut dyn FnMut() -> String,
    ) -> Result<Option<Cancellation>> {
        match self {
            Operation::Unconfirmed(_) => Ok(None),
            Operation::SimpleConfirm { tip, .. } => {
                console.warn("Warning: the following operation carries some risk, proceed with care:");
                if let Some(tip) = tip {
                    console.say(tip);
                }
                if ask_yes(
                    console,
                    "Enter Y to continue (case-insensitive, anything else cancels): ",
                )? {
                    Ok(None)
                } else {
                    Ok(Some(Cancellation::Declined))
                }
            }
            Operation::TokenConfirm { tip, .. } => {
                console.warn(
                    "Warning: the following operation is dangerous. Unless necessary, perform it from the provider console:",
                );
                if let Some(tip) = tip {
                    console.say(tip);
                }
                let token = issue_token();
                let answer = read_answer(
                    console,
                    &format!("Enter {} to continue (a wrong entry cancels): ", token),
                )?;
                if answer.trim() == token {
                    Ok(None)
                } else {
                    Ok(Some(Cancellation::WrongToken))
                }
            }
        }
    }

    /// Help-mode rendering: risk tip and flag list, no prompt, no action
    pub fn describe(&self, console: &mut dyn Console) {
        match self.tip() {
            Some(tip) => console.say(&format!("Risk: {} ({})", tip, self.tier())),
            None if !matches!(self, Operation::Unconfirmed(_)) => {
                console.say(&format!("Risk: {}", self.tier()))
            }
            None => {}
        }
        for line in self.action().usage().lines() {
            console.say(line.trim_end());
        }
    }

    /// Confirm according to the tier, then run the action.
    ///
    /// In [`Mode::Help`] only the risk tip is written.
    pub fn invoke(&self, inv: &mut Invocation<'_>, mode: Mode) -> Result<Completion> {
        if mode == Mode::Help {
            self.describe(&mut *inv.console);
            return Ok(Completion::Done);
        }

        if let Some(reason) = self.confirm(&mut *inv.console, &mut *inv.env.tokens)? {
            tracing::info!(%reason, "operation cancelled at confirmation");
            inv.console.say(&reason.to_string());
            return Ok(Completion::Cancelled(reason));
        }
        self.action().call(inv)
    }
}

/// Read one answer; end of input counts as an empty answer
pub(crate) fn read_answer(console: &mut dyn Console, prompt: &str) -> Result<String> {
    match console.ask(prompt) {
        Ok(answer) => Ok(answer),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Ask a yes/no question; only a trimmed, case-insensitive `y` is yes
pub(crate) fn ask_yes(console: &mut dyn Console, prompt: &str) -> Result<bool> {
    let answer = read_answer(console, prompt)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Operators without flags of their own
#[derive(Debug, Clone, Default, Args)]
pub struct NoFlags {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::ScriptedConsole;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_action(counter: Rc<Cell<usize>>) -> Action {
        Action::new(move |_: NoFlags, _inv: &mut Invocation<'_>| {
            counter.set(counter.get() + 1);
            Ok(Completion::Done)
        })
    }

    fn env() -> Environment {
        Environment::new(AccountStore::in_memory(vec![]), DriverCatalog::empty())
            .with_token_source(|| "ab12c".to_string())
    }

    fn run(op: &Operation, answers: &[&str], mode: Mode) -> (Completion, ScriptedConsole) {
        let mut console = ScriptedConsole::with_answers(answers.iter().copied());
        let mut env = env();
        let matches = op.action().parse(&[]).unwrap();
        let completion = {
            let mut inv = Invocation {
                matches,
                console: &mut console,
                env: &mut env,
            };
            op.invoke(&mut inv, mode).unwrap()
        };
        (completion, console)
    }

    #[test]
    fn test_unconfirmed_runs_without_prompt() {
        let counter = Rc::new(Cell::new(0));
        let op = Operation::unconfirmed(counting_action(counter.clone()));
        let (completion, console) = run(&op, &[], Mode::Execute);
        assert_eq!(completion, Completion::Done);
        assert_eq!(counter.get(), 1);
        assert_eq!(console.prompts, 0);
    }

    #[test]
    fn test_simple_confirm_accepts_y_in_any_case() {
        for answer in ["y", "Y", "  y  "] {
            let counter = Rc::new(Cell::new(0));
            let op = Operation::simple("save your work", counting_action(counter.clone()));
            let (completion, console) = run(&op, &[answer], Mode::Execute);
            assert_eq!(completion, Completion::Done);
            assert_eq!(counter.get(), 1, "answer {:?}", answer);
            assert!(console.contains("save your work"));
        }
    }

    #[test]
    fn test_simple_confirm_rejects_everything_else() {
        for answer in ["n", "yes", "", "yy", "N"] {
            let counter = Rc::new(Cell::new(0));
            let op = Operation::simple("", counting_action(counter.clone()));
            let (completion, console) = run(&op, &[answer], Mode::Execute);
            assert_eq!(completion, Completion::Cancelled(Cancellation::Declined));
            assert_eq!(counter.get(), 0, "answer {:?}", answer);
            assert!(console.contains("Operation cancelled"));
        }
    }

    #[test]
    fn test_simple_confirm_treats_eof_as_decline() {
        let counter = Rc::new(Cell::new(0));
        let op = Operation::simple("", counting_action(counter.clone()));
        let (completion, _) = run(&op, &[], Mode::Execute);
        assert_eq!(completion, Completion::Cancelled(Cancellation::Declined));
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_token_confirm_wrong_token_never_runs() {
        for answer in ["AB12C", "ab12", "ab12cd", "y", ""] {
            let counter = Rc::new(Cell::new(0));
            let op = Operation::token("cannot be undone", counting_action(counter.clone()));
            let (completion, console) = run(&op, &[answer], Mode::Execute);
            assert_eq!(completion, Completion::Cancelled(Cancellation::WrongToken));
            assert_eq!(counter.get(), 0);
            assert!(console.contains("Wrong token"));
        }
    }

    #[test]
    fn test_token_confirm_exact_token_runs() {
        let counter = Rc::new(Cell::new(0));
        let op = Operation::token("cannot be undone", counting_action(counter.clone()));
        let (completion, console) = run(&op, &["ab12c"], Mode::Execute);
        assert_eq!(completion, Completion::Done);
        assert_eq!(counter.get(), 1);
        assert!(console.contains("Enter ab12c to continue"));
    }

    #[test]
    fn test_help_mode_skips_prompt_and_action() {
        let counter = Rc::new(Cell::new(0));
        let op = Operation::token("cannot be undone", counting_action(counter.clone()));
        let (completion, console) = run(&op, &[], Mode::Help);
        assert_eq!(completion, Completion::Done);
        assert_eq!(counter.get(), 0);
        assert_eq!(console.prompts, 0);
        assert!(console.contains("cannot be undone"));
    }

    #[derive(Debug, Args)]
    struct Login {
        #[arg(long, visible_alias = "pw", allow_hyphen_values = true)]
        password: Option<String>,
        #[arg(short = 'f', long)]
        force: bool,
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_help_token_in_flag_position() {
        let action = Action::new(|_: Login, _: &mut Invocation<'_>| Ok(Completion::Done));
        assert!(action.wants_help(&argv(&["--help"])));
        assert!(action.wants_help(&argv(&["-f", "-h"])));
        assert!(action.wants_help(&argv(&["--password=-h", "-help"])));
        assert!(action.wants_help(&argv(&["--password", "x", "-h"])));
    }

    #[test]
    fn test_help_token_as_flag_value_is_not_help() {
        let action = Action::new(|_: Login, _: &mut Invocation<'_>| Ok(Completion::Done));
        assert!(!action.wants_help(&argv(&["--password", "-h"])));
        assert!(!action.wants_help(&argv(&["--pw", "--help", "-f"])));
        assert!(!action.wants_help(&argv(&["--password=-h"])));
        let matches = action.parse(&argv(&["--password", "-h"])).unwrap();
        let login = Login::from_arg_matches(&matches).unwrap();
        assert_eq!(login.password.as_deref(), Some("-h"));
        assert!(!login.force);
    }

    #[test]
    fn test_random_token_shape() {
        let token = random_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
