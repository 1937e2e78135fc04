// crates/dataset-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for dataset-gate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use dataset_gate_config::ConfigError;
use dataset_gate_config::GatewayConfig;

/// Smallest TOML document a node accepts.
pub const MINIMAL_TOML: &str = r#"
[auth]
jwks_uri = "https://login.example.com/keys"
"#;

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<GatewayConfig, ConfigError> {
    GatewayConfig::from_toml_str(MINIMAL_TOML)
}
