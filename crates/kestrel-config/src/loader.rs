// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./kestrel.toml` > `~/.config/kestrel/kestrel.toml` > `/etc/kestrel/kestrel.toml`
//! with environment variable overrides via `KESTREL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::KestrelConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kestrel/kestrel.toml` (system-wide)
/// 3. `~/.config/kestrel/kestrel.toml` (user XDG config)
/// 4. `./kestrel.toml` (local directory)
/// 5. `KESTREL_*` environment variables
pub fn load_config() -> Result<KestrelConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KestrelConfig::default()))
        .merge(Toml::file("/etc/kestrel/kestrel.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kestrel/kestrel.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kestrel.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<KestrelConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KestrelConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KestrelConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KestrelConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `KESTREL_DEBOUNCE_MAX_BUFFER_SIZE`
/// must map to `debounce.max_buffer_size`, not `debounce.max.buffer.size`.
fn env_provider() -> Env {
    Env::prefixed("KESTREL_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: KESTREL_DEBOUNCE_INTERVAL_MS -> "debounce_interval_ms"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("debounce_", "debounce.", 1)
            .replacen("deals_", "deals.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("transcript_", "transcript.", 1);
        mapped.into()
    })
}
