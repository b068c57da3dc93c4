//! Binary tests with piped standard input
//!
//! Runs the built `lhbin` executable against a fixture account, answering
//! confirmation prompts through a pipe instead of a terminal.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use lhbin::driver::fixture::RegionInventory;
use lhbin::driver::InstanceState;
use lhbin::{AccountConfig, AccountStore, Inventory};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    config: PathBuf,
    inventory: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.yaml");
        let inventory = dir.path().join("inventory.yaml");

        Inventory {
            regions: vec![RegionInventory::named("a").with_instance("x1", "web-1")],
            ..Default::default()
        }
        .save(&inventory)
        .unwrap();

        let mut store = AccountStore::load(&config).unwrap();
        store.add(AccountConfig {
            driver: "fixture".to_string(),
            account: "main".to_string(),
            inventory: Some(inventory.clone()),
            ..Default::default()
        });
        store.save().unwrap();

        Self {
            _dir: dir,
            config,
            inventory,
        }
    }

    /// Run the binary, write `input` to its stdin and close it
    fn run(&self, args: &[&str], input: &str) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_lhbin"))
            .args(args)
            .env("LHBIN_CONFIG", &self.config)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(input.as_bytes()).unwrap();
        drop(stdin);
        child.wait_with_output().unwrap()
    }

    fn state(&self, id: &str) -> Option<InstanceState> {
        Inventory::load(&self.inventory)
            .unwrap()
            .regions
            .into_iter()
            .flat_map(|r| r.instances)
            .find(|i| i.id == id)
            .map(|i| i.state)
    }
}

// =============================================================================
// Piped confirmations
// =============================================================================

mod piped_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STOP: [&str; 6] = ["ins", "stop", "--region", "a", "--insids", "x1"];

    #[test]
    fn test_piped_yes_confirms() {
        let ws = Workspace::new();
        let output = ws.run(&STOP, "y\n");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "{}", stdout);
        assert!(stdout.contains("succeeded"), "{}", stdout);
        assert_eq!(ws.state("x1"), Some(InstanceState::Stopped));
    }

    #[test]
    fn test_piped_no_declines() {
        let ws = Workspace::new();
        let output = ws.run(&STOP, "n\n");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert!(stdout.contains("Operation cancelled"), "{}", stdout);
        assert_eq!(ws.state("x1"), Some(InstanceState::Running));
    }

    #[test]
    fn test_closed_stdin_declines() {
        let ws = Workspace::new();
        let output = ws.run(&STOP, "");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Operation cancelled"), "{}", stdout);
        assert_eq!(ws.state("x1"), Some(InstanceState::Running));
    }
}
