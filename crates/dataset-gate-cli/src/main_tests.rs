// crates/dataset-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and log filter resolution.
// Purpose: Ensure commands parse as documented and RUST_LOG overrides config.
// Dependencies: dataset-gate-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises the clap surface and the logging directive fallback without
//! installing a global subscriber.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use clap::Parser;
use dataset_gate_config::LoggingConfig;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::logging::filter_directive;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn serve_accepts_a_config_path() {
    let cli = Cli::try_parse_from(["dataset-gate", "serve", "--config", "node.toml"]).unwrap();
    let Commands::Serve(args) = cli.command else {
        panic!("expected serve");
    };
    assert_eq!(args.config.as_deref(), Some(Path::new("node.toml")));
}

#[test]
fn config_check_path_is_optional() {
    let cli = Cli::try_parse_from(["dataset-gate", "config", "check"]).unwrap();
    let Commands::Config {
        command: ConfigCommand::Check(args),
    } = cli.command
    else {
        panic!("expected config check");
    };
    assert!(args.config.is_none());
}

#[test]
fn unknown_commands_are_rejected() {
    assert!(Cli::try_parse_from(["dataset-gate", "migrate"]).is_err());
    assert!(Cli::try_parse_from(["dataset-gate"]).is_err());
}

#[test]
fn rust_log_overrides_configured_level() {
    let config = LoggingConfig {
        level: "warn".to_string(),
        ..LoggingConfig::default()
    };
    assert_eq!(
        filter_directive(Some("dataset_gate_node=debug"), &config),
        "dataset_gate_node=debug"
    );
    assert_eq!(filter_directive(None, &config), "warn");
    assert_eq!(filter_directive(Some("  "), &config), "warn");
}
