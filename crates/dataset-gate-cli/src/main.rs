// crates/dataset-gate-cli/src/main.rs
// ============================================================================
// Module: Dataset Gate CLI Entry Point
// Description: Command dispatcher for running and configuring a gateway node.
// Purpose: Start the node with fail-closed startup and clean ctrl-c shutdown.
// Dependencies: clap, dataset-gate-config, dataset-gate-node, thiserror, tokio.
// ============================================================================

//! ## Overview
//! `dataset-gate serve` loads `dataset-gate.toml`, installs logging, builds a
//! [`GatewayNode`] over in-memory collaborators, and serves until the node
//! stops or ctrl-c arrives. `config check` validates a file without binding
//! anything and `config example` prints a canonical configuration.
//!
//! Security posture: startup failures (unreachable key endpoint, unreadable
//! certificates, invalid config) exit non-zero before any listener accepts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub(crate) mod logging;
#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use dataset_gate_config::GatewayConfig;
use dataset_gate_config::config_toml_example;
use dataset_gate_node::Collaborators;
use dataset_gate_node::GatewayNode;
use thiserror::Error;

use crate::logging::init_logging;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "dataset-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway node.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Check(ConfigArgs),
    /// Print a canonical example configuration.
    Example,
}

/// Shared configuration path argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to `dataset-gate.toml` (overrides `DATASET_GATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the message shown to the operator.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(&args)?;
    init_logging(&config.logging).map_err(|err| CliError::new(err.to_string()))?;

    let node = GatewayNode::from_config(&config, Collaborators::in_memory())
        .await
        .map_err(|err| CliError::new(format!("node startup failed: {err}")))?;
    tracing::info!(
        http_addr = %node.http_addr(),
        rpc_addr = %node.rpc_addr(),
        "dataset gate listening"
    );

    let serving = node.serve();
    tokio::pin!(serving);
    let result = tokio::select! {
        result = &mut serving => result,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    tracing::info!("shutdown requested");
                    node.shutdown();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "ctrl-c handler unavailable");
                }
            }
            serving.await
        }
    };
    result.map_err(|err| CliError::new(format!("node failed: {err}")))?;
    tracing::info!("dataset gate stopped");
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check(args) => command_config_check(&args),
        ConfigCommand::Example => command_config_example(),
    }
}

/// Executes the config check command.
fn command_config_check(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    write_stdout_line(&format!(
        "config ok: http {} rpc {} keys {}",
        config.server.bind, config.rpc.bind, config.auth.jwks_uri
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the config example command.
fn command_config_example() -> CliResult<ExitCode> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(config_toml_example().as_bytes())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration from the resolved path.
fn load_config(args: &ConfigArgs) -> CliResult<GatewayConfig> {
    GatewayConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
