#![forbid(unsafe_code)]

//! @acp:module "lhbin Library"
//! @acp:summary "Command dispatch and batch execution for cloud instance operators"
//! @acp:domain cli
//! @acp:layer api
//! @acp:stability stable
//!
//! # lhbin
//!
//! Operator CLI for lightweight cloud instances across accounts and regions.
//!
//! ## Features
//!
//! - **Command registry**: `<command> <operator>` routing with aliases and nested help
//! - **Risk tiers**: operators run unconfirmed, after a `y`, or after retyping a token
//! - **Batch execution**: one operator over every matching instance, failures isolated per target
//! - **Pluggable drivers**: accounts name a driver; `fixture` serves an inventory file
//!
//! ## Example
//!
//! ```rust,no_run
//! use lhbin::{commands, AccountStore, Dispatcher, DriverCatalog, Environment, TerminalConsole};
//!
//! fn main() -> anyhow::Result<()> {
//!     let registry = commands::builtin_registry();
//!     let mut env = Environment::new(AccountStore::load_default()?, DriverCatalog::builtin());
//!     let mut console = TerminalConsole::new();
//!
//!     let args = vec!["ins".to_string(), "list".to_string()];
//!     let outcome = Dispatcher::new(&registry).dispatch(&args, &mut console, &mut env);
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

pub mod batch;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod format;
pub mod operation;
pub mod registry;
pub mod terminal;

// Re-exports
pub use batch::{
    BatchOptions, BatchOutcome, BatchSummary, Breadth, ResolvedTarget, TargetFilter, Targets,
    Unresolved,
};
pub use config::{AccountConfig, AccountStore};
pub use dispatch::{Dispatch, Dispatcher};
pub use driver::{Driver, DriverCatalog, DriverError, FixtureDriver, Inventory};
pub use error::{LhError, Result};
pub use operation::{Action, Cancellation, Completion, Environment, Invocation, Mode, Operation};
pub use registry::{Command, CommandRegistry, Operator};
pub use terminal::{Console, ScriptedConsole, TerminalConsole};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
