//! Config defaults and validation tests for dataset-gate-config.
// crates/dataset-gate-config/tests/config_validation.rs
// =============================================================================
// Module: Config Defaults and Validation Tests
// Description: Validate default behavior and config invariants.
// Purpose: Ensure minimal config is valid and unsafe settings fail closed.
// =============================================================================

use std::io::Write;
use std::time::Duration;

use dataset_gate_config::ConfigError;
use dataset_gate_config::GatewayConfig;
use dataset_gate_config::LogFormat;
use dataset_gate_config::config_toml_example;

mod common;

type TestResult = Result<(), String>;

/// Asserts that `result` failed with a message containing `needle`.
fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn minimal_config_applies_defaults() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    if config.auth.refresh_interval() != Duration::from_secs(300) {
        return Err("refresh interval should default to 5 minutes".to_string());
    }
    if config.rpc.idle_timeout() != Duration::from_secs(300) {
        return Err("rpc idle timeout should default to 5 minutes".to_string());
    }
    if config.rpc.keepalive_interval() != Duration::from_secs(300) {
        return Err("rpc keepalive should default to 5 minutes".to_string());
    }
    if config.auth.allowed_algorithms != vec!["RS256".to_string()] {
        return Err("allowed algorithms should default to RS256".to_string());
    }
    if config.logging.format != LogFormat::Text {
        return Err("logging should default to text".to_string());
    }
    if config.rpc.cert_path.is_some() {
        return Err("identity paths have no default".to_string());
    }
    Ok(())
}

#[test]
fn example_config_validates() -> TestResult {
    let config =
        GatewayConfig::from_toml_str(&config_toml_example()).map_err(|err| err.to_string())?;
    if config.rpc.client_ca_path.as_deref() != Some("certs/ca.pem") {
        return Err("example should set a trust anchor".to_string());
    }
    Ok(())
}

#[test]
fn auth_section_is_required() -> TestResult {
    assert_invalid(GatewayConfig::from_toml_str(""), "config parse error")
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    let toml = format!("{}\nsurprise = true\n", common::MINIMAL_TOML);
    assert_invalid(GatewayConfig::from_toml_str(&toml), "config parse error")
}

#[test]
fn jwks_uri_requires_https_for_remote_hosts() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.jwks_uri = "http://login.example.com/keys".to_string();
    assert_invalid(config.validate(), "must use https")
}

#[test]
fn jwks_uri_allows_http_on_loopback() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.jwks_uri = "http://127.0.0.1:9000/keys".to_string();
    config.validate().map_err(|err| err.to_string())?;
    config.auth.jwks_uri = "http://localhost:9000/keys".to_string();
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn jwks_uri_rejects_other_schemes() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.jwks_uri = "file:///etc/keys.json".to_string();
    assert_invalid(config.validate(), "unsupported scheme")
}

#[test]
fn symmetric_algorithms_are_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.allowed_algorithms = vec!["HS256".to_string()];
    assert_invalid(config.validate(), "unsupported algorithm: HS256")
}

#[test]
fn empty_algorithm_list_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.allowed_algorithms.clear();
    assert_invalid(config.validate(), "must not be empty")
}

#[test]
fn zero_refresh_interval_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.refresh_interval_secs = 0;
    assert_invalid(config.validate(), "auth.refresh_interval_secs")
}

#[test]
fn bind_must_be_socket_address() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.rpc.bind = "not-an-address".to_string();
    assert_invalid(config.validate(), "rpc.bind is not a socket address")
}

#[test]
fn empty_identity_path_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.rpc.cert_path = Some(" ".to_string());
    assert_invalid(config.validate(), "rpc.cert_path must be non-empty")
}

#[test]
fn body_limit_must_be_positive() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "server.max_body_bytes")
}

#[test]
fn load_reads_file_from_path() -> TestResult {
    let mut file = tempfile::NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(common::MINIMAL_TOML.as_bytes()).map_err(|err| err.to_string())?;
    let config = GatewayConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.auth.jwks_uri != "https://login.example.com/keys" {
        return Err("jwks uri not loaded".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = tempfile::NamedTempFile::new().map_err(|err| err.to_string())?;
    let padding = "#".repeat(1024 * 1024 + 1);
    file.write_all(padding.as_bytes()).map_err(|err| err.to_string())?;
    assert_invalid(GatewayConfig::load(Some(file.path())), "exceeds size limit")
}

#[test]
fn load_reports_missing_file_as_io() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    assert_invalid(GatewayConfig::load(Some(&missing)), "config io error")
}
