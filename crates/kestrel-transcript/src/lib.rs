// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session transcript integrity for the Kestrel trading agent.
//!
//! Session history is an append-only log of turn records, replayed into
//! the model context when a conversation resumes. Crashes, lost writes,
//! and mid-flight shutdowns can leave tool calls without results or
//! results without calls; replaying such a log corrupts the context.
//! This crate restores the pairing invariant with a single best-effort
//! pass that never fails the caller.

pub mod event;
pub mod log;
pub mod sanitizer;

pub use event::TranscriptEvent;
pub use log::{parse_lines, sanitize_log, session_log_path};
pub use sanitizer::{sanitize, SanitizeReport};
