//! Typed fragments of the raw per-line JSONL schema.
//!
//! The real log format is wide and evolves across agent CLI versions
//! (content block kinds especially), so content blocks are kept as thin
//! wrappers over `serde_json::Value` rather than an exhaustive tagged
//! union — new block kinds show up as `Other` without breaking
//! deserialization, matching the parser's "never throw" contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token usage as reported on an assistant message. Field names mirror the
/// real API payload; cache fields carry both common spellings since some
/// replay tooling emits the short form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, alias = "cache_write_tokens")]
    pub cache_creation_input_tokens: u64,
    #[serde(default, alias = "cache_read_tokens")]
    pub cache_read_input_tokens: u64,
    /// Nested per-TTL cache-creation breakdown (`ephemeral_5m_input_tokens`,
    /// `ephemeral_1h_input_tokens`, ...). Not rolled into totals; kept only
    /// so deserialization tolerates it instead of rejecting the line.
    #[serde(default, skip_serializing)]
    pub cache_creation: Option<Value>,
}

/// One assistant content block (`text`, `tool_use`, `thinking`, ...),
/// kept as a raw JSON object with convenience accessors for the fields
/// the enricher cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentBlock(pub Value);

impl ContentBlock {
    pub fn block_type(&self) -> &str {
        self.0.get("type").and_then(Value::as_str).unwrap_or("")
    }

    pub fn is_tool_use(&self) -> bool {
        self.block_type() == "tool_use"
    }

    pub fn tool_use_id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get("text").and_then(Value::as_str)
    }
}

/// One item in a user message's content array: plain text or a
/// `tool_result` carrying the outcome of a prior `tool_use`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserContentItem(pub Value);

impl UserContentItem {
    pub fn is_tool_result(&self) -> bool {
        self.0.get("type").and_then(Value::as_str) == Some("tool_result")
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.get("type").and_then(Value::as_str), None | Some("text"))
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get("text").and_then(Value::as_str)
    }

    pub fn tool_use_id(&self) -> Option<&str> {
        self.0.get("tool_use_id").and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.0.get("is_error").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Flatten the `content` field (string, or array of text blocks) to a
    /// single display string.
    pub fn result_text(&self) -> String {
        match self.0.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// `message.content` on a `user` record: either a bare string (a prompt)
/// or a list of content items possibly mixing text and tool results.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Items(Vec<UserContentItem>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUserMessage {
    #[serde(default)]
    pub content: Option<UserContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAssistantMessage {
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSnapshot {
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_accepts_canonical_field_names() {
        let raw = r#"{"input_tokens":10,"output_tokens":20,"cache_creation_input_tokens":5,"cache_read_input_tokens":2}"#;
        let usage: Usage = serde_json::from_str(raw).unwrap();
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.cache_creation_input_tokens, 5);
    }

    #[test]
    fn usage_tolerates_nested_cache_creation_object() {
        let raw = r#"{
            "input_tokens": 1,
            "output_tokens": 2,
            "cache_creation": { "ephemeral_5m_input_tokens": 3, "ephemeral_1h_input_tokens": 0 }
        }"#;
        let usage: Usage = serde_json::from_str(raw).unwrap();
        assert_eq!(usage.input_tokens, 1);
        assert_eq!(usage.cache_creation_input_tokens, 0);
    }

    #[test]
    fn content_block_exposes_tool_use_fields() {
        let block: ContentBlock =
            serde_json::from_str(r#"{"type":"tool_use","id":"t1","name":"Bash","input":{}}"#)
                .unwrap();
        assert!(block.is_tool_use());
        assert_eq!(block.tool_use_id(), Some("t1"));
        assert_eq!(block.tool_name(), Some("Bash"));
    }

    #[test]
    fn user_content_item_flattens_array_tool_result() {
        let item: UserContentItem = serde_json::from_str(
            r#"{"type":"tool_result","tool_use_id":"t1","is_error":true,"content":[{"type":"text","text":"boom"}]}"#,
        )
        .unwrap();
        assert!(item.is_tool_result());
        assert!(item.is_error());
        assert_eq!(item.result_text(), "boom");
    }
}
