//! End-to-end operator tests
//!
//! Each run loads the account store from disk and talks to a fixture account
//! whose inventory file persists between runs, the way separate `lhbin`
//! processes would.

use std::path::PathBuf;

use lhbin::driver::fixture::RegionInventory;
use lhbin::driver::{InstanceState, Zone};
use lhbin::{
    commands, AccountConfig, AccountStore, Cancellation, Completion, Dispatch, Dispatcher,
    DriverCatalog, Environment, Inventory, LhError, ScriptedConsole,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const TOKEN: &str = "k3y9z";

struct Harness {
    _dir: TempDir,
    config: PathBuf,
    inventory: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.yaml");
        let inventory = dir.path().join("inventory.yaml");

        let mut region = RegionInventory::named("a")
            .with_instance("x1", "web-1")
            .with_instance("x2", "web-2");
        region.blueprints.push(lhbin::driver::Blueprint {
            id: "lhbp-ubuntu".to_string(),
            name: "Ubuntu".to_string(),
            os_name: "Ubuntu Server 24.04 LTS 64bit".to_string(),
            ..Default::default()
        });
        region.zones.push(Zone {
            name: "Zone A-1".to_string(),
            zone: "a-1".to_string(),
        });
        Inventory {
            regions: vec![region, RegionInventory::named("b").with_instance("y1", "db-1")],
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

    fn run(&self, args: &[&str], answers: &[&str]) -> (Dispatch, ScriptedConsole) {
        let registry = commands::builtin_registry();
        let mut env = Environment::new(
            AccountStore::load(&self.config).unwrap(),
            DriverCatalog::builtin(),
        )
        .with_token_source(|| TOKEN.to_string());
        let mut console = ScriptedConsole::with_answers(answers.iter().copied());
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let outcome = Dispatcher::new(&registry).dispatch(&args, &mut console, &mut env);
        (outcome, console)
    }

    fn inventory(&self) -> Inventory {
        Inventory::load(&self.inventory).unwrap()
    }

    fn state(&self, region: &str, id: &str) -> Option<InstanceState> {
        self.inventory()
            .regions
            .into_iter()
            .find(|r| r.region == region)?
            .instances
            .into_iter()
            .find(|i| i.id == id)
            .map(|i| i.state)
    }
}

// =============================================================================
// Confirmation tiers
// =============================================================================

mod confirmation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_confirmed_stop_changes_state() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "stop", "--region", "a", "--insid", "x1"], &["y"]);
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert_eq!(console.prompts, 1);
        assert!(console.contains("stop web-1 (x1) in a: succeeded"));
        assert_eq!(h.state("a", "x1"), Some(InstanceState::Stopped));
        assert_eq!(h.state("a", "x2"), Some(InstanceState::Running));
    }

    #[test]
    fn test_declined_stop_leaves_state() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["instance", "stop", "--region", "a", "--insid", "x1"], &["nope"]);
        assert!(matches!(
            outcome,
            Dispatch::Completed(Completion::Cancelled(Cancellation::Declined))
        ));
        assert_eq!(outcome.exit_code(), 0);
        assert!(console.contains("Operation cancelled"));
        assert_eq!(h.state("a", "x1"), Some(InstanceState::Running));
    }

    #[test]
    fn test_wrong_token_keeps_instance() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "terminate", "--region", "a", "--insid", "x1"], &["k3y9Z"]);
        assert!(matches!(
            outcome,
            Dispatch::Completed(Completion::Cancelled(Cancellation::WrongToken))
        ));
        assert!(console.contains(TOKEN));
        assert_eq!(h.state("a", "x1"), Some(InstanceState::Running));
    }

    #[test]
    fn test_exact_token_terminates() {
        let h = Harness::new();
        let (outcome, _) = h.run(&["ins", "destroy", "--region", "a", "--insid", "x1"], &[TOKEN]);
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert_eq!(h.state("a", "x1"), None);
        assert_eq!(h.state("a", "x2"), Some(InstanceState::Running));
    }

    #[test]
    fn test_unconfirmed_operator_never_prompts() {
        let h = Harness::new();
        h.run(&["ins", "stop", "--region", "b", "--insid", "y1"], &["y"]);
        let (outcome, console) = h.run(&["ins", "start", "--region", "b", "--insid", "y1"], &[]);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(console.prompts, 0);
        assert_eq!(h.state("b", "y1"), Some(InstanceState::Running));
    }
}

// =============================================================================
// Validation and failures
// =============================================================================

mod validation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reset_without_image_fails() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "reset", "--region", "a", "--insid", "x1"], &[TOKEN]);
        assert!(matches!(outcome, Dispatch::Failed(LhError::Validation(_))));
        assert_eq!(outcome.exit_code(), 1);
        assert!(console.contains("--imageid"));
        assert!(console.outcomes.is_empty());
    }

    #[test]
    fn test_reset_with_image_reinstalls() {
        let h = Harness::new();
        let (outcome, _) = h.run(
            &["ins", "reset", "--region", "a", "--insid", "x2", "--imageid", "lhbp-ubuntu"],
            &[TOKEN],
        );
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        let inventory = h.inventory();
        let x2 = inventory.regions[0]
            .instances
            .iter()
            .find(|i| i.id == "x2")
            .unwrap();
        assert_eq!(x2.os_name, "Ubuntu Server 24.04 LTS 64bit");
    }

    #[test]
    fn test_unknown_flag_fails_before_prompt() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "terminate", "--zone", "a-1"], &[TOKEN]);
        assert!(matches!(outcome, Dispatch::Failed(LhError::Validation(_))));
        assert_eq!(console.prompts, 0);
    }

    #[test]
    fn test_unknown_account_fails() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "list", "--account", "nobody"], &[]);
        assert!(matches!(outcome, Dispatch::Failed(LhError::AccountNotFound { .. })));
        assert!(console.contains("Operation failed"));
    }

    #[test]
    fn test_per_target_failure_is_reported_and_batch_continues() {
        let h = Harness::new();
        let (outcome, console) = h.run(
            &["ins", "start", "--region", "a", "--insids", "x1,ghost,x2"],
            &[],
        );
        // Running instances reject start; the unknown ID cannot be resolved
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert_eq!(console.outcomes.len(), 3);
        assert!(console.outcomes.iter().all(|o| !o.is_success()));
        assert!(console.contains("start ghost in a: failed: cannot resolve instance"));
    }
}

// =============================================================================
// Batch breadth
// =============================================================================

mod breadth_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_whole_region_needs_second_confirmation() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "stop", "--region", "a"], &["y", "n"]);
        assert!(matches!(
            outcome,
            Dispatch::Completed(Completion::Cancelled(Cancellation::BreadthDeclined))
        ));
        assert_eq!(console.prompts, 2);
        assert!(console.contains("every instance in a"));
        assert_eq!(h.state("a", "x1"), Some(InstanceState::Running));
        assert_eq!(h.state("a", "x2"), Some(InstanceState::Running));
    }

    #[test]
    fn test_force_skips_breadth_confirmation() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "stop", "-f"], &["y"]);
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert_eq!(console.prompts, 1);
        let stopped: Vec<Option<&str>> = console.outcomes.iter().map(|o| o.instance_id()).collect();
        assert_eq!(stopped, vec![Some("x1"), Some("x2"), Some("y1")]);
        assert_eq!(h.state("b", "y1"), Some(InstanceState::Stopped));
    }
}

// =============================================================================
// Operator catalogue
// =============================================================================

mod catalogue_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_firewall_update_with_defaults() {
        let h = Harness::new();
        let (outcome, _) = h.run(
            &["iptable", "reset", "--region", "a", "--insid", "x1", "--defaults", "--rule", "TCP|8080"],
            &["y"],
        );
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        let rules = h.inventory().regions[0].firewall_rules["x1"].clone();
        let ports: Vec<String> = rules.into_iter().map(|r| r.port).collect();
        assert_eq!(ports, vec!["ALL", "22", "3389", "80", "443", "8080"]);
    }

    #[test]
    fn test_snapshot_create_records_snapshot() {
        let h = Harness::new();
        let (outcome, console) = h.run(
            &["ss", "create", "--region", "a", "--insid", "x2", "--name", "nightly"],
            &[],
        );
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert_eq!(console.prompts, 0);
        let snapshots = h.inventory().regions[0].snapshots.clone();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].name, "nightly");
        assert_eq!(snapshots[0].instance_id, "x2");
        assert!(snapshots[0].id.starts_with("lhsnap-"));
    }

    #[test]
    fn test_snapshot_create_requires_name() {
        let h = Harness::new();
        let (outcome, _) = h.run(&["ss", "create", "--region", "a", "--insid", "x2"], &[]);
        assert!(matches!(outcome, Dispatch::Failed(LhError::Validation(_))));
        assert!(h.inventory().regions[0].snapshots.is_empty());
    }

    #[test]
    fn test_keypair_create_prints_private_key() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["kp", "create", "--region", "b", "--keyname", "ops"], &[]);
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert!(console.contains("Private key:"));
        let key_pairs = h.inventory().regions[1].key_pairs.clone();
        assert_eq!(key_pairs.len(), 1);
        assert_eq!(key_pairs[0].name, "ops");
    }

    #[test]
    fn test_account_add_then_list_masks_secret() {
        let h = Harness::new();
        let inventory = h.inventory.display().to_string();
        let (outcome, _) = h.run(
            &[
                "account", "add", "--account", "staging", "--inventory", inventory.as_str(), "--akid",
                "AKID1234", "--key", "supersecret",
            ],
            &[],
        );
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));

        let (_, console) = h.run(&["account", "list"], &[]);
        assert!(console.contains("staging"));
        assert!(console.contains("supe*******"));
        assert!(!console.contains("supersecret"));
        assert_eq!(AccountStore::load(&h.config).unwrap().accounts().len(), 2);
    }

    #[test]
    fn test_account_delete_unknown_fails() {
        let h = Harness::new();
        let (outcome, _) = h.run(&["account", "del", "--account", "staging"], &[]);
        assert!(matches!(outcome, Dispatch::Failed(LhError::AccountNotFound { .. })));
    }

    #[test]
    fn test_help_flag_never_runs_operator() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "terminate", "--region", "a", "--insid", "x1", "-h"], &[]);
        assert!(matches!(outcome, Dispatch::Help));
        assert_eq!(console.prompts, 0);
        assert!(console.contains("Risk:"));
        assert_eq!(h.state("a", "x1"), Some(InstanceState::Running));
    }

    #[test]
    fn test_help_token_as_password_value_runs_operator() {
        let h = Harness::new();
        let (outcome, console) = h.run(
            &["ins", "passwd", "--region", "a", "--insid", "x1", "--username", "root", "--password", "-h"],
            &["y"],
        );
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert_eq!(console.prompts, 1);
        assert!(!console.contains("Risk:"));
        assert!(console.contains("succeeded"));

        let (outcome, console) = h.run(&["ins", "passwd", "--region", "a", "--insid", "x1", "-h"], &[]);
        assert!(matches!(outcome, Dispatch::Help));
        assert_eq!(console.prompts, 0);
    }

    #[test]
    fn test_terminate_misspelled_alias() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["ins", "destory", "--region", "a", "--insid", "x2"], &[TOKEN]);
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert!(console.contains("succeeded"));
        assert_eq!(h.state("a", "x2"), None);
    }

    #[test]
    fn test_region_zones_lists_zones() {
        let h = Harness::new();
        let (outcome, console) = h.run(&["region", "zones", "--region", "a"], &[]);
        assert!(matches!(outcome, Dispatch::Completed(Completion::Done)));
        assert!(console.contains("Zone A-1"));
        assert!(console.contains("a-1"));

        let (outcome, _) = h.run(&["region", "zone"], &[]);
        assert!(matches!(outcome, Dispatch::Failed(LhError::Validation(_))));
    }
}
