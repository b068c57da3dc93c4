#![forbid(unsafe_code)]
//! lhbin command line interface

use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use lhbin::{commands, AccountStore, Dispatcher, DriverCatalog, Environment, TerminalConsole, VERSION};

/// Log filter override, takes precedence over RUST_LOG
const LOG_ENV: &str = "LHBIN_LOG";

fn init_logging() {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if matches!(args.first().map(String::as_str), Some("--version" | "-V")) {
        println!("lhbin {}", VERSION);
        return Ok(ExitCode::SUCCESS);
    }

    let accounts = AccountStore::load_default().context("failed to load the account store")?;
    let mut env = Environment::new(accounts, DriverCatalog::builtin());
    let registry = commands::builtin_registry();
    let mut console = TerminalConsole::new();

    let outcome = Dispatcher::new(&registry).dispatch(&args, &mut console, &mut env);
    Ok(ExitCode::from(outcome.exit_code() as u8))
}
