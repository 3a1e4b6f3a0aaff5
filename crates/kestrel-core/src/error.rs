// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kestrel trading agent.

use thiserror::Error;

/// The primary error type used across the Kestrel workspace.
#[derive(Debug, Error)]
pub enum KestrelError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A debounce batch handler failed while processing a flushed batch.
    #[error("batch handler error: {message}")]
    Handler {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A deal failed validation (negative values, unknown participant, bad offer).
    #[error("invalid deal: {0}")]
    InvalidDeal(String),

    /// A session transcript could not be loaded.
    #[error("transcript error: {0}")]
    Transcript(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
