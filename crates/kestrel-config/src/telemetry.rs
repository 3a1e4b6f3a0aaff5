// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup driven by agent configuration.

use tracing_subscriber::EnvFilter;

use crate::model::AgentConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise the configured
/// `agent.log_level` is used as the default directive. Calling this twice
/// is harmless: the second install attempt is ignored.
pub fn init_tracing(agent: &AgentConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(agent.log_level.clone()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        let agent = AgentConfig::default();
        init_tracing(&agent);
        // Second call must not panic even though a subscriber is installed.
        init_tracing(&agent);
    }
}
