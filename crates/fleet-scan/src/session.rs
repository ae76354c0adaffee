//! `scanSessions` / `extractSessionSummary`: one forward read to collect
//! lead metadata plus per-message-id usage, then a backward scan for the
//! last timestamp in the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use fleet_transcript::schemas::Usage;

use crate::types::SessionSummary;
use crate::uuidstem::is_session_stem;

const PREVIEW_MAX_CHARS: usize = 200;

/// List `.jsonl` files under `project_dir` whose stem is a lowercase UUID
/// and summarize each. Sorted descending by `lastActiveAt`, nulls last.
pub fn scan_sessions(project_dir: &Path) -> Vec<SessionSummary> {
    let Ok(entries) = fs::read_dir(project_dir) else {
        return Vec::new();
    };

    let mut sessions: Vec<SessionSummary> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("jsonl")
                && p.file_stem()
                    .and_then(|s| s.to_str())
                    .map(is_session_stem)
                    .unwrap_or(false)
        })
        .filter_map(|p| extract_session_summary(&p))
        .collect();

    sessions.sort_by(|a, b| match (&b.last_active_at, &a.last_active_at) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    sessions
}

/// Cheap backward-only scan for the last timestamp in a transcript, used
/// by `scanProjects` to find a project's most recent activity without
/// paying for a full forward read of every session.
pub fn last_active_at(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    backward_scan_timestamp(&content)
}

fn backward_scan_timestamp(content: &str) -> Option<String> {
    for line in content.lines().rev() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if let Some(ts) = value.get("timestamp").and_then(Value::as_str) {
            return Some(ts.to_string());
        }
        if let Some(ts) = value
            .get("snapshot")
            .and_then(|s| s.get("timestamp"))
            .and_then(Value::as_str)
        {
            return Some(ts.to_string());
        }
    }
    None
}

/// Find `<sessionId>.jsonl` under any project directory beneath any
/// configured base path. Shared by the tailer supervisor (to resolve a
/// subscription) and the session-detail REST handler (to resolve a fetch).
pub fn resolve_session_path(base_paths: &[PathBuf], session_id: &str) -> Option<PathBuf> {
    let filename = format!("{session_id}.jsonl");

    for base in base_paths {
        let Ok(entries) = fs::read_dir(base) else {
            continue;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let candidate = entry.path().join(&filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

pub fn extract_session_summary(path: &Path) -> Option<SessionSummary> {
    let stem = path.file_stem()?.to_str()?.to_string();
    let content = fs::read_to_string(path).ok()?;

    let mut started_at: Option<String> = None;
    let mut first_prompt: Option<String> = None;
    let mut cwd: Option<String> = None;
    let mut git_branch: Option<String> = None;
    let mut model: Option<String> = None;
    let mut usage_by_message_id: HashMap<String, Usage> = HashMap::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };

        if started_at.is_none() {
            if let Some(ts) = value.get("timestamp").and_then(Value::as_str) {
                started_at = Some(ts.to_string());
            } else if let Some(ts) = value
                .get("snapshot")
                .and_then(|s| s.get("timestamp"))
                .and_then(Value::as_str)
            {
                started_at = Some(ts.to_string());
            }
        }

        match value.get("type").and_then(Value::as_str) {
            Some("user") => {
                let is_meta = value.get("isMeta").and_then(Value::as_bool).unwrap_or(false);
                if !is_meta && first_prompt.is_none() {
                    if let Some(text) = extract_user_text(&value) {
                        first_prompt = Some(text.chars().take(PREVIEW_MAX_CHARS).collect());
                        cwd = value.get("cwd").and_then(Value::as_str).map(String::from);
                        git_branch = value.get("gitBranch").and_then(Value::as_str).map(String::from);
                    }
                }
            }
            Some("assistant") => {
                if let Some(message) = value.get("message") {
                    if model.is_none() {
                        model = message.get("model").and_then(Value::as_str).map(String::from);
                    }
                    if let Some(id) = message.get("id").and_then(Value::as_str) {
                        if let Some(usage_value) = message.get("usage") {
                            if let Ok(usage) = serde_json::from_value::<Usage>(usage_value.clone()) {
                                usage_by_message_id.insert(id.to_string(), usage);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let last_active_at = backward_scan_timestamp(&content);

    let mut totals = Usage::default();
    let mut cost = 0.0;
    for usage in usage_by_message_id.values() {
        totals.input_tokens += usage.input_tokens;
        totals.output_tokens += usage.output_tokens;
        totals.cache_creation_input_tokens += usage.cache_creation_input_tokens;
        totals.cache_read_input_tokens += usage.cache_read_input_tokens;
        cost += fleet_transcript::pricing::cost(usage, model.as_deref());
    }

    Some(SessionSummary {
        session_id: stem,
        first_prompt,
        model,
        started_at,
        last_active_at,
        cwd,
        git_branch,
        input_tokens: totals.input_tokens,
        output_tokens: totals.output_tokens,
        cache_creation_input_tokens: totals.cache_creation_input_tokens,
        cache_read_input_tokens: totals.cache_read_input_tokens,
        cost,
    })
}

fn extract_user_text(value: &Value) -> Option<String> {
    let content = value.get("message")?.get("content")?;
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let text: String = items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_session(dir: &Path, id: &str, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join(format!("{id}.jsonl"));
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn resolve_session_path_finds_file_under_any_project_dir() {
        let base = tempfile::tempdir().unwrap();
        let project = base.path().join("-proj");
        fs::create_dir(&project).unwrap();
        let session_id = "550e8400-e29b-41d4-a716-446655440099";
        fs::write(project.join(format!("{session_id}.jsonl")), "").unwrap();

        let found = resolve_session_path(&[base.path().to_path_buf()], session_id);
        assert_eq!(found, Some(project.join(format!("{session_id}.jsonl"))));
    }

    #[test]
    fn resolve_session_path_missing_file_yields_none() {
        let base = tempfile::tempdir().unwrap();
        assert!(resolve_session_path(&[base.path().to_path_buf()], "missing").is_none());
    }

    #[test]
    fn extracts_first_prompt_model_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "550e8400-e29b-41d4-a716-446655440000",
            &[
                r#"{"type":"user","uuid":"u1","timestamp":"2024-01-01T00:00:00Z","cwd":"/tmp","gitBranch":"main","message":{"content":"hello there"}}"#,
                r#"{"type":"assistant","timestamp":"2024-01-01T00:01:00Z","message":{"id":"msg-A","model":"claude-3-5-sonnet-20241022","usage":{"input_tokens":10,"output_tokens":5}}}"#,
                r#"{"type":"assistant","timestamp":"2024-01-01T00:02:00Z","message":{"id":"msg-A","model":"claude-3-5-sonnet-20241022","usage":{"input_tokens":10,"output_tokens":20}}}"#,
            ],
        );

        let summary = extract_session_summary(&path).unwrap();
        assert_eq!(summary.first_prompt.as_deref(), Some("hello there"));
        assert_eq!(summary.cwd.as_deref(), Some("/tmp"));
        assert_eq!(summary.model.as_deref(), Some("claude-3-5-sonnet-20241022"));
        assert_eq!(summary.output_tokens, 20, "last-wins usage per message id");
        assert_eq!(summary.started_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(summary.last_active_at.as_deref(), Some("2024-01-01T00:02:00Z"));
    }

    #[test]
    fn meta_prompts_are_skipped_for_first_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "550e8400-e29b-41d4-a716-446655440001",
            &[
                r#"{"type":"user","uuid":"u1","isMeta":true,"message":{"content":"setup"}}"#,
                r#"{"type":"user","uuid":"u2","message":{"content":"real prompt"}}"#,
            ],
        );

        let summary = extract_session_summary(&path).unwrap();
        assert_eq!(summary.first_prompt.as_deref(), Some("real prompt"));
    }

    #[test]
    fn snapshot_only_file_seeds_started_at_from_snapshot_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "550e8400-e29b-41d4-a716-446655440003",
            &[r#"{"type":"file-history-snapshot","snapshot":{"timestamp":"2024-01-01T00:05:00Z"}}"#],
        );

        let summary = extract_session_summary(&path).unwrap();
        assert_eq!(summary.started_at.as_deref(), Some("2024-01-01T00:05:00Z"));
        assert_eq!(summary.model, None);
        assert_eq!(summary.input_tokens, 0);
    }

    #[test]
    fn backward_scan_prefers_snapshot_timestamp_when_trailing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "550e8400-e29b-41d4-a716-446655440002",
            &[
                r#"{"type":"user","uuid":"u1","timestamp":"2024-01-01T00:00:00Z","message":{"content":"hi"}}"#,
                r#"{"type":"file-history-snapshot","snapshot":{"timestamp":"2024-01-01T00:05:00Z"}}"#,
            ],
        );

        let summary = extract_session_summary(&path).unwrap();
        assert_eq!(summary.last_active_at.as_deref(), Some("2024-01-01T00:05:00Z"));
    }
}
