// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Kestrel trading agent.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! use kestrel_config::load_config;
//!
//! let config = load_config().expect("config errors");
//! println!("Agent name: {}", config.agent.name);
//! ```

pub mod loader;
pub mod model;
pub mod telemetry;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::KestrelConfig;
pub use telemetry::init_tracing;
