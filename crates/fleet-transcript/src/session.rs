use serde::Serialize;
use serde_json::Value;

use crate::message::ParsedMessage;
use crate::schemas::{ContentBlock, Usage};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub turn_index: u32,
    pub prompt_text: String,
    pub prompt_uuid: String,
    pub duration_ms: Option<f64>,
    pub response_count: u32,
    pub tool_use_count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstitutedResponse {
    pub message_id: String,
    pub turn_index: u32,
    pub model: Option<String>,
    pub usage: Usage,
    pub blocks: Vec<ContentBlock>,
    pub line_index_start: usize,
    pub line_index_end: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultRef {
    pub tool_use_id: Option<String>,
    pub is_error: bool,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedToolCall {
    pub tool_use_id: String,
    pub tool_name: String,
    pub turn_index: u32,
    pub input: Value,
    pub tool_result_block: Option<ToolResultRef>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub total_tokens: u64,
    pub tool_use_count: u32,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSample {
    pub tool_use_id: Option<String>,
    pub error_text: String,
    pub turn_index: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStat {
    pub tool_name: String,
    pub call_count: u32,
    pub error_count: u32,
    pub error_samples: Vec<ErrorSample>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentRef {
    pub prompt: Option<String>,
    pub agent_id: Option<String>,
    pub parent_tool_use_id: Option<String>,
    pub stats: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub message_id: String,
    pub cumulative_input_tokens: u64,
    pub cumulative_output_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedSession {
    pub messages: Vec<ParsedMessage>,
    pub turns: Vec<Turn>,
    pub responses: Vec<ReconstitutedResponse>,
    pub tool_calls: Vec<PairedToolCall>,
    pub totals: TokenTotals,
    pub tool_stats: Vec<ToolStat>,
    pub subagents: Vec<SubagentRef>,
    pub context_snapshots: Vec<ContextSnapshot>,
}
