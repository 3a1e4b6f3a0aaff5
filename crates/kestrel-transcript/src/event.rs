// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript turn records, one JSON object per log line.

use serde::{Deserialize, Serialize};

/// One turn of a session transcript.
///
/// The pairing invariant: every `tool_result` must reference a call id
/// emitted by the most recent `assistant` turn whose calls are still
/// unresolved, and a `user` turn must never follow unresolved calls in a
/// sanitized transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// A message from the human participant.
    User { text: String },

    /// An agent turn, carrying zero or more emitted tool call ids.
    Assistant {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<String>,
    },

    /// The outcome of one tool call. A missing or empty `call_id` is
    /// malformed and will be dropped by sanitization.
    ToolResult {
        #[serde(default)]
        call_id: Option<String>,
        output: String,
    },

    /// Any other record kind (notices, markers). Passes through
    /// sanitization unchanged.
    System { text: String },
}
