//! Line-by-line transcript parsing: `parse_line` never fails. Malformed
//! JSON or schema-violating lines become a `Malformed` record instead of
//! an error, so one bad line in a multi-megabyte transcript never aborts
//! the read.

use serde_json::Value;

use crate::message::{ParsedMessage, ToolResultItem};
use crate::schemas::{RawAssistantMessage, RawUserMessage, UserContent};

/// Parse one JSONL line. Returns an empty vec for whitespace-only input.
/// A `user` record whose content mixes a text item and `tool_result`
/// items yields both a `UserPrompt` and a `UserToolResult` sharing the
/// same `uuid` — the only case where more than one message comes out of
/// a single line.
pub fn parse_line(raw: &str, line_index: usize) -> Vec<ParsedMessage> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return vec![malformed(raw, line_index, e.to_string())],
    };

    let kind = value.get("type").and_then(Value::as_str).unwrap_or("");

    match kind {
        "user" => parse_user(&value, raw, line_index),
        "assistant" => parse_assistant(&value, raw, line_index),
        "system" => vec![parse_system(&value, raw, line_index)],
        "file-history-snapshot" => vec![parse_snapshot(&value, raw, line_index)],
        "progress" => vec![parse_progress(&value, raw, line_index)],
        "queue-operation" => vec![ParsedMessage::QueueOperation {
            line_index,
            raw: value,
        }],
        other => vec![malformed(raw, line_index, format!("unknown type: {other:?}"))],
    }
}

fn malformed(raw: &str, line_index: usize, error: String) -> ParsedMessage {
    ParsedMessage::Malformed {
        line_index,
        raw: raw.to_string(),
        error,
    }
}

fn parse_user(value: &Value, raw: &str, line_index: usize) -> Vec<ParsedMessage> {
    let uuid = match value.get("uuid").and_then(Value::as_str) {
        Some(u) => u.to_string(),
        None => return vec![malformed(raw, line_index, "user record missing uuid".into())],
    };
    let parent_uuid = value
        .get("parentUuid")
        .and_then(Value::as_str)
        .map(String::from);
    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .map(String::from);
    let is_meta = value.get("isMeta").and_then(Value::as_bool).unwrap_or(false);
    let cwd = value.get("cwd").and_then(Value::as_str).map(String::from);
    let git_branch = value
        .get("gitBranch")
        .and_then(Value::as_str)
        .map(String::from);

    let message: RawUserMessage = match value.get("message").cloned() {
        Some(m) => match serde_json::from_value(m) {
            Ok(m) => m,
            Err(e) => return vec![malformed(raw, line_index, format!("user message: {e}"))],
        },
        None => return vec![malformed(raw, line_index, "user record missing message".into())],
    };

    let mut out = Vec::new();
    match message.content {
        Some(UserContent::Text(text)) => {
            out.push(ParsedMessage::UserPrompt {
                line_index,
                uuid,
                parent_uuid,
                timestamp,
                text,
                cwd,
                git_branch,
                is_meta,
            });
        }
        Some(UserContent::Items(items)) => {
            let text: String = items
                .iter()
                .filter(|i| i.is_text())
                .filter_map(|i| i.text())
                .collect::<Vec<_>>()
                .join("\n");
            if !text.is_empty() {
                out.push(ParsedMessage::UserPrompt {
                    line_index,
                    uuid: uuid.clone(),
                    parent_uuid,
                    timestamp,
                    text,
                    cwd,
                    git_branch,
                    is_meta,
                });
            }

            let results: Vec<ToolResultItem> = items
                .iter()
                .filter(|i| i.is_tool_result())
                .map(|i| ToolResultItem {
                    tool_use_id: i.tool_use_id().map(String::from),
                    is_error: i.is_error(),
                    text: i.result_text(),
                })
                .collect();
            if !results.is_empty() {
                out.push(ParsedMessage::UserToolResult {
                    line_index,
                    uuid,
                    results,
                });
            }
        }
        None => {}
    }

    out
}

fn parse_assistant(value: &Value, raw: &str, line_index: usize) -> Vec<ParsedMessage> {
    let message: RawAssistantMessage = match value.get("message").cloned() {
        Some(m) => match serde_json::from_value(m) {
            Ok(m) => m,
            Err(e) => return vec![malformed(raw, line_index, format!("assistant message: {e}"))],
        },
        None => {
            return vec![malformed(
                raw,
                line_index,
                "assistant record missing message".into(),
            )]
        }
    };

    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .map(String::from);
    let is_synthetic = value
        .get("isSynthetic")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    message
        .content
        .into_iter()
        .map(|block| ParsedMessage::AssistantBlock {
            line_index,
            message_id: message.id.clone(),
            model: message.model.clone(),
            usage: message.usage.clone(),
            timestamp: timestamp.clone(),
            turn_index: 0,
            block,
            is_synthetic,
        })
        .collect()
}

fn parse_system(value: &Value, raw: &str, line_index: usize) -> ParsedMessage {
    match value.get("subtype").and_then(Value::as_str) {
        Some("turn_duration") => match value.get("durationMs").and_then(Value::as_f64) {
            Some(duration_ms) => ParsedMessage::SystemTurnDuration {
                line_index,
                duration_ms,
            },
            None => malformed(raw, line_index, "turn_duration missing durationMs".into()),
        },
        Some("api_error") => {
            let error = value
                .get("error")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| value.get("error").map(|e| e.to_string()).unwrap_or_default());
            ParsedMessage::SystemApiError { line_index, error }
        }
        Some("local_command") => match value.get("command").and_then(Value::as_str) {
            Some(command) => ParsedMessage::SystemLocalCommand {
                line_index,
                command: command.to_string(),
            },
            None => malformed(raw, line_index, "local_command missing command".into()),
        },
        Some(other) => malformed(raw, line_index, format!("unknown system subtype: {other:?}")),
        None => malformed(raw, line_index, "system record missing subtype".into()),
    }
}

fn parse_snapshot(value: &Value, raw: &str, line_index: usize) -> ParsedMessage {
    match value
        .get("snapshot")
        .and_then(|s| s.get("timestamp"))
        .and_then(Value::as_str)
    {
        Some(timestamp) => ParsedMessage::FileHistorySnapshot {
            line_index,
            timestamp: timestamp.to_string(),
        },
        None => malformed(raw, line_index, "snapshot missing timestamp".into()),
    }
}

fn parse_progress(value: &Value, raw: &str, line_index: usize) -> ParsedMessage {
    match value.get("subtype").and_then(Value::as_str) {
        Some("agent") => ParsedMessage::ProgressAgent {
            line_index,
            agent_id: value.get("agentId").and_then(Value::as_str).map(String::from),
            parent_tool_use_id: value
                .get("parentToolUseID")
                .and_then(Value::as_str)
                .map(String::from),
            prompt: value.get("prompt").and_then(Value::as_str).map(String::from),
        },
        Some("bash") => ParsedMessage::ProgressBash {
            line_index,
            raw: value.clone(),
        },
        Some("hook") => ParsedMessage::ProgressHook {
            line_index,
            raw: value.clone(),
        },
        Some(other) => malformed(raw, line_index, format!("unknown progress subtype: {other:?}")),
        None => malformed(raw, line_index, "progress record missing subtype".into()),
    }
}
