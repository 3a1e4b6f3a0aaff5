// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session log loading: one JSON turn record per line, append-only.

use std::path::{Path, PathBuf};

use kestrel_config::model::TranscriptConfig;
use tracing::{debug, warn};

use crate::event::TranscriptEvent;
use crate::sanitizer::{sanitize, SanitizeReport};

/// Path of the append-only log for one session.
pub fn session_log_path(config: &TranscriptConfig, session_key: &str) -> PathBuf {
    Path::new(&config.log_dir).join(format!("{session_key}.jsonl"))
}

/// Parse transcript lines, skipping unparsable ones individually.
///
/// Returns the parsed events and the count of corrupt lines. Blank lines
/// are ignored without counting; a half-written trailing line from a crash
/// mid-append counts as one corrupt entry, never aborts the load.
pub fn parse_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> (Vec<TranscriptEvent>, usize) {
    let mut events = Vec::new();
    let mut corrupt = 0;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<TranscriptEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                corrupt += 1;
                debug!(error = %e, "skipping corrupt transcript line");
            }
        }
    }

    (events, corrupt)
}

/// Load, parse, and sanitize one session's transcript.
///
/// Never fails the caller: an unreadable log degrades to an empty
/// transcript with a warning, since refusing to load history would make
/// the conversation unusable.
pub fn sanitize_log(path: &Path) -> (Vec<TranscriptEvent>, SanitizeReport) {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "session log unreadable, starting empty");
            return (Vec::new(), SanitizeReport::default());
        }
    };

    let (events, corrupt) = parse_lines(raw.lines());
    let (kept, mut report) = sanitize(events);
    report.corrupt += corrupt;

    if !report.is_clean() {
        warn!(
            path = %path.display(),
            violations = report.violations,
            orphans = report.orphans,
            corrupt = report.corrupt,
            "transcript sanitized with anomalies"
        );
    }

    (kept, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn session_log_path_joins_dir_and_key() {
        let config = TranscriptConfig {
            log_dir: "/var/lib/kestrel/sessions".to_string(),
        };
        assert_eq!(
            session_log_path(&config, "chat-42"),
            PathBuf::from("/var/lib/kestrel/sessions/chat-42.jsonl")
        );
    }

    #[test]
    fn parse_lines_skips_corrupt_lines_individually() {
        let lines = vec![
            r#"{"role":"user","text":"hi"}"#,
            "{not json",
            "",
            r#"{"role":"assistant","text":"hello"}"#,
            r#"{"role":"martian","text":"??"}"#,
        ];
        let (events, corrupt) = parse_lines(lines);
        assert_eq!(events.len(), 2);
        assert_eq!(corrupt, 2, "bad JSON and unknown role each count once");
    }

    #[test]
    fn sanitize_log_reads_and_repairs_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{"role":"user","text":"hi"}}"#).unwrap();
        writeln!(
            file,
            r#"{{"role":"assistant","text":"checking","tool_calls":["c1"]}}"#
        )
        .unwrap();
        writeln!(file, r#"{{"role":"tool_result","call_id":"c1","output":"ok"}}"#).unwrap();
        writeln!(file, r#"{{"role":"tool_result","call_id":"ghost","output":"?"}}"#).unwrap();
        // Half-written trailing line, as left by a crash mid-append.
        write!(file, r#"{{"role":"user","te"#).unwrap();
        drop(file);

        let (events, report) = sanitize_log(&path);
        assert_eq!(events.len(), 3);
        assert_eq!(report.orphans, 1);
        assert_eq!(report.corrupt, 1);
        assert_eq!(report.violations, 0);
    }

    #[test]
    fn missing_log_degrades_to_empty_transcript() {
        let (events, report) = sanitize_log(Path::new("/nonexistent/kestrel/session.jsonl"));
        assert!(events.is_empty());
        assert!(report.is_clean());
    }
}
