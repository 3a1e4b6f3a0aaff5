// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Kestrel configuration system.

use kestrel_config::load_config_from_str;
use kestrel_config::model::KestrelConfig;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_kestrel_config() {
    let toml = r#"
[agent]
name = "test-agent"
log_level = "debug"

[debounce]
enabled = false
interval_ms = 500
max_wait_multiplier = 4
max_buffer_size = 8

[deals]
proposal_window_secs = 600
verification_window_secs = 1200
queue_page_size = 50

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[transcript]
log_dir = "/tmp/sessions"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "test-agent");
    assert_eq!(config.agent.log_level, "debug");
    assert!(!config.debounce.enabled);
    assert_eq!(config.debounce.interval_ms, 500);
    assert_eq!(config.debounce.max_wait_multiplier, 4);
    assert_eq!(config.debounce.max_buffer_size, 8);
    assert_eq!(config.deals.proposal_window_secs, 600);
    assert_eq!(config.deals.verification_window_secs, 1200);
    assert_eq!(config.deals.queue_page_size, 50);
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.transcript.log_dir, "/tmp/sessions");
}

/// Unknown field in [debounce] section produces an error.
#[test]
fn unknown_field_in_debounce_produces_error() {
    let toml = r#"
[debounce]
intervall_ms = 500
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    // Figment wraps serde's deny_unknown_fields error
    assert!(
        err_str.contains("unknown field") || err_str.contains("intervall_ms"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown field in [deals] section produces an error.
#[test]
fn unknown_field_in_deals_produces_error() {
    let toml = r#"
[deals]
verifcation_window_secs = 60
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("verifcation_window_secs"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let toml = "";
    let config = load_config_from_str(toml).expect("empty TOML should use defaults");

    assert_eq!(config.agent.name, "kestrel");
    assert_eq!(config.agent.log_level, "info");
    assert!(config.debounce.enabled);
    assert_eq!(config.debounce.interval_ms, 2000);
    assert_eq!(config.debounce.max_wait_multiplier, 3);
    assert_eq!(config.debounce.max_buffer_size, 10);
    assert_eq!(config.deals.proposal_window_secs, 900);
    assert_eq!(config.deals.verification_window_secs, 1800);
    assert_eq!(config.deals.queue_page_size, 25);
    assert!(config.storage.wal_mode);
}

/// Environment variable KESTREL_AGENT_NAME overrides agent.name in TOML.
#[test]
fn env_var_overrides_agent_name() {
    // We test this via the Figment builder directly to control env vars in test
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[agent]
name = "from-toml"
"#;

    // Simulate KESTREL_AGENT_NAME env var by building figment with test env
    let config: KestrelConfig = Figment::new()
        .merge(Serialized::defaults(KestrelConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("agent.name", "envtest"))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.agent.name, "envtest");
}

/// Environment variable KESTREL_DEBOUNCE_MAX_BUFFER_SIZE maps to
/// debounce.max_buffer_size (NOT debounce.max.buffer.size).
#[test]
fn env_var_overrides_debounce_max_buffer_size() {
    use figment::{providers::Serialized, Figment};

    let config: KestrelConfig = Figment::new()
        .merge(Serialized::defaults(KestrelConfig::default()))
        .merge(("debounce.max_buffer_size", 7))
        .extract()
        .expect("should set max_buffer_size via dot notation");

    assert_eq!(config.debounce.max_buffer_size, 7);
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: KestrelConfig = Figment::new()
        .merge(Serialized::defaults(KestrelConfig::default()))
        .merge(Toml::file("/nonexistent/path/kestrel.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    // Should just get defaults
    assert_eq!(config.agent.name, "kestrel");
}
