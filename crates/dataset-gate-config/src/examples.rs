// crates/dataset-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `dataset-gate config example`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Dataset Gate configuration. The output is static and
//! must always parse and validate.

/// Returns a canonical example `dataset-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "0.0.0.0:8080"
header_read_timeout_secs = 30
idle_timeout_secs = 120
request_timeout_secs = 300
max_body_bytes = 1048576
shutdown_grace_secs = 30

[rpc]
bind = "0.0.0.0:5000"
cert_path = "certs/node.pem"
key_path = "certs/node.key"
client_ca_path = "certs/ca.pem"
idle_timeout_secs = 300
keepalive_interval_secs = 300
keepalive_timeout_secs = 20
handshake_timeout_secs = 10

[auth]
jwks_uri = "https://login.microsoftonline.com/common/discovery/v2.0/keys"
refresh_interval_secs = 300
fetch_timeout_secs = 5
allowed_algorithms = ["RS256"]
leeway_secs = 60
# audience = ["api://dataset-gate"]
# issuer = ["https://login.microsoftonline.com/<tenant>/v2.0"]

[logging]
level = "info"
format = "text"
"#,
    )
}
