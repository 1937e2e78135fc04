// crates/dataset-gate-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Process-wide tracing subscriber installation.
// Purpose: Route node diagnostics to stderr in text or JSON form.
// Dependencies: dataset-gate-config, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! The subscriber is installed once per process. `RUST_LOG` takes precedence
//! over `logging.level` so operators can raise verbosity without editing the
//! config file. Output always goes to stderr; stdout is reserved for command
//! results.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dataset_gate_config::LogFormat;
use dataset_gate_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive did not parse.
    #[error("logging error: invalid filter '{directive}': {reason}")]
    Filter {
        /// Directive that was rejected.
        directive: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was already installed.
    #[error("logging error: {0}")]
    Install(String),
}

// ============================================================================
// SECTION: Installation
// ============================================================================

/// Picks the filter directive: a non-blank `RUST_LOG` value, else `logging.level`.
pub fn filter_directive(env_value: Option<&str>, config: &LoggingConfig) -> String {
    env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| config.level.clone(), str::to_string)
}

/// Installs the global stderr subscriber described by `config`.
///
/// # Errors
///
/// Returns [`LoggingError`] when the directive is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_value = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(env_value.as_deref(), config);
    let filter = EnvFilter::try_new(&directive).map_err(|err| LoggingError::Filter {
        directive: directive.clone(),
        reason: err.to_string(),
    })?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| LoggingError::Install(err.to_string()))
}
