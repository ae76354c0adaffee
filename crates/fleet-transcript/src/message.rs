use serde::Serialize;

use crate::schemas::{ContentBlock, Usage};

/// One parsed entry from a session transcript. `line_index` is the
/// 0-based position of the originating JSONL line; `turn_index` on
/// `AssistantBlock` starts at 0 and is filled in by the enricher's forward
/// pass (the parser alone cannot know which turn is open).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ParsedMessage {
    FileHistorySnapshot {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        timestamp: String,
    },
    UserPrompt {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        uuid: String,
        #[serde(rename = "parentUuid")]
        parent_uuid: Option<String>,
        timestamp: Option<String>,
        text: String,
        cwd: Option<String>,
        #[serde(rename = "gitBranch")]
        git_branch: Option<String>,
        #[serde(rename = "isMeta")]
        is_meta: bool,
    },
    UserToolResult {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        uuid: String,
        results: Vec<ToolResultItem>,
    },
    AssistantBlock {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        #[serde(rename = "messageId")]
        message_id: String,
        model: Option<String>,
        usage: Usage,
        timestamp: Option<String>,
        #[serde(rename = "turnIndex")]
        turn_index: u32,
        block: ContentBlock,
        #[serde(rename = "isSynthetic")]
        is_synthetic: bool,
    },
    SystemTurnDuration {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        #[serde(rename = "durationMs")]
        duration_ms: f64,
    },
    SystemApiError {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        error: String,
    },
    SystemLocalCommand {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        command: String,
    },
    ProgressAgent {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        #[serde(rename = "agentId")]
        agent_id: Option<String>,
        #[serde(rename = "parentToolUseID")]
        parent_tool_use_id: Option<String>,
        prompt: Option<String>,
    },
    ProgressBash {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        raw: serde_json::Value,
    },
    ProgressHook {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        raw: serde_json::Value,
    },
    QueueOperation {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        raw: serde_json::Value,
    },
    Malformed {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        raw: String,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResultItem {
    #[serde(rename = "toolUseId")]
    pub tool_use_id: Option<String>,
    #[serde(rename = "isError")]
    pub is_error: bool,
    pub text: String,
}

impl ParsedMessage {
    pub fn line_index(&self) -> usize {
        match self {
            ParsedMessage::FileHistorySnapshot { line_index, .. }
            | ParsedMessage::UserPrompt { line_index, .. }
            | ParsedMessage::UserToolResult { line_index, .. }
            | ParsedMessage::AssistantBlock { line_index, .. }
            | ParsedMessage::SystemTurnDuration { line_index, .. }
            | ParsedMessage::SystemApiError { line_index, .. }
            | ParsedMessage::SystemLocalCommand { line_index, .. }
            | ParsedMessage::ProgressAgent { line_index, .. }
            | ParsedMessage::ProgressBash { line_index, .. }
            | ParsedMessage::ProgressHook { line_index, .. }
            | ParsedMessage::QueueOperation { line_index, .. }
            | ParsedMessage::Malformed { line_index, .. } => *line_index,
        }
    }
}
