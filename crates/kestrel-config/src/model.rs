// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kestrel trading agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Kestrel configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KestrelConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Inbound message debouncing settings.
    #[serde(default)]
    pub debounce: DebounceConfig,

    /// Escrow deal lifecycle settings.
    #[serde(default)]
    pub deals: DealsConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session transcript settings.
    #[serde(default)]
    pub transcript: TranscriptConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "kestrel".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Inbound message debouncing configuration.
///
/// The debouncer buffers rapid messages per conversation and hands the
/// batch to the conversation handler after a quiet period, with total
/// latency capped at `interval_ms * max_wait_multiplier`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebounceConfig {
    /// Master switch. When false, every message is processed immediately.
    #[serde(default = "default_debounce_enabled")]
    pub enabled: bool,

    /// Quiet period in milliseconds before a buffered batch is flushed.
    #[serde(default = "default_debounce_interval_ms")]
    pub interval_ms: u64,

    /// Hard latency cap as a multiple of `interval_ms`. A buffered message
    /// is never delayed past `interval_ms * max_wait_multiplier`.
    #[serde(default = "default_max_wait_multiplier")]
    pub max_wait_multiplier: u32,

    /// Maximum messages held per conversation before a forced flush.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
}

impl DebounceConfig {
    /// Quiet period as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Hard latency cap as a [`Duration`].
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.interval_ms * u64::from(self.max_wait_multiplier))
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            enabled: default_debounce_enabled(),
            interval_ms: default_debounce_interval_ms(),
            max_wait_multiplier: default_max_wait_multiplier(),
            max_buffer_size: default_max_buffer_size(),
        }
    }
}

fn default_debounce_enabled() -> bool {
    true
}

fn default_debounce_interval_ms() -> u64 {
    2000
}

fn default_max_wait_multiplier() -> u32 {
    3
}

fn default_max_buffer_size() -> usize {
    10
}

/// Escrow deal lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DealsConfig {
    /// Seconds a proposed deal stays open before it can be expired.
    #[serde(default = "default_proposal_window_secs")]
    pub proposal_window_secs: u64,

    /// Seconds granted for payment and verification after acceptance.
    /// The deal's deadline is re-based to this window on accept.
    #[serde(default = "default_verification_window_secs")]
    pub verification_window_secs: u64,

    /// Page size for the verification/execution poll queues.
    #[serde(default = "default_queue_page_size")]
    pub queue_page_size: u32,
}

impl Default for DealsConfig {
    fn default() -> Self {
        Self {
            proposal_window_secs: default_proposal_window_secs(),
            verification_window_secs: default_verification_window_secs(),
            queue_page_size: default_queue_page_size(),
        }
    }
}

fn default_proposal_window_secs() -> u64 {
    900
}

fn default_verification_window_secs() -> u64 {
    1800
}

fn default_queue_page_size() -> u32 {
    25
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("kestrel").join("kestrel.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("kestrel.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Session transcript configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptConfig {
    /// Directory holding per-session append-only transcript logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

fn default_log_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("kestrel").join("sessions"))
        .unwrap_or_else(|| std::path::PathBuf::from("sessions"))
        .to_string_lossy()
        .into_owned()
}
