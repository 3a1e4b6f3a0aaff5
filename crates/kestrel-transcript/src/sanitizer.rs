// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pairing-invariant sanitizer: a single forward pass that restores
//! the tool-call / tool-result contract over an ordered transcript.
//!
//! The pass is a pure function with one piece of walking state, the set of
//! call ids emitted by the most recent assistant turn that are still
//! unresolved. It never fails: anomalies degrade to dropped entries and
//! counters, because refusing to load history would make the conversation
//! unusable.

use std::collections::HashSet;

use crate::event::TranscriptEvent;

/// Counts of anomalies encountered while sanitizing a transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Turns reached while earlier calls were still unresolved.
    pub violations: usize,
    /// Tool results dropped for referencing no live call id.
    pub orphans: usize,
    /// Log lines that could not be parsed at all.
    pub corrupt: usize,
}

impl SanitizeReport {
    /// True when the transcript needed no repairs.
    pub fn is_clean(&self) -> bool {
        self.violations == 0 && self.orphans == 0 && self.corrupt == 0
    }
}

/// Restore the pairing invariant over an ordered transcript.
///
/// - An assistant turn reached with unresolved calls counts one violation;
///   its own call ids then replace (not union) the pending set.
/// - A tool result whose call id is missing, empty, or not pending is an
///   orphan and is dropped; otherwise it resolves its id and is kept.
/// - A user turn reached with unresolved calls counts one violation and
///   clears the pending set; the user turn itself is always kept.
/// - System records pass through untouched.
pub fn sanitize(events: Vec<TranscriptEvent>) -> (Vec<TranscriptEvent>, SanitizeReport) {
    let mut pending: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(events.len());
    let mut report = SanitizeReport::default();

    for event in events {
        match event {
            TranscriptEvent::Assistant { ref tool_calls, .. } => {
                if !pending.is_empty() {
                    report.violations += 1;
                }
                pending.clear();
                pending.extend(tool_calls.iter().cloned());
                kept.push(event);
            }
            TranscriptEvent::ToolResult { ref call_id, .. } => match call_id {
                Some(id) if !id.is_empty() && pending.remove(id) => kept.push(event),
                _ => {
                    report.orphans += 1;
                }
            },
            TranscriptEvent::User { .. } => {
                if !pending.is_empty() {
                    // Those calls are now permanently orphaned: their
                    // results, if they ever arrive, will be dropped.
                    report.violations += 1;
                    pending.clear();
                }
                kept.push(event);
            }
            TranscriptEvent::System { .. } => kept.push(event),
        }
    }

    (kept, report)
}
