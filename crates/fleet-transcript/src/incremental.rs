//! The live-tailing twin of [`crate::enricher::enrich_session`]: folds a
//! batch of newly-parsed messages into an existing `EnrichedSession`
//! without re-walking everything seen before.
//!
//! `applyBatch(enrichSession(prefix), suffix)` must equal
//! `enrichSession(prefix ++ suffix)` — tool cost is therefore recomputed
//! exactly (as a per-response delta) rather than approximated from an
//! average cost-per-token, even though `costPerToken` remains on the
//! context for callers that genuinely cannot re-derive it (e.g. a
//! lighter-weight client mirror without the pricing table).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::message::ParsedMessage;
use crate::pricing;
use crate::session::{
    ContextSnapshot, EnrichedSession, ErrorSample, PairedToolCall, ReconstitutedResponse, ToolStat,
    Turn,
};

/// State threaded across calls to [`apply_batch`] for one live session.
#[derive(Debug, Default)]
pub struct IncrementalContext {
    pub seen_message_ids: HashSet<String>,
    pub tool_use_id_to_name: HashMap<String, String>,
    /// Fallback average cost per token, used only when a response's model
    /// is unknown and an exact per-response rate cannot be resolved.
    pub cost_per_token: f64,
}

impl IncrementalContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fold `batch` into `prev`, returning `prev` unchanged (same `Arc`) when
/// the batch carries no observable record.
pub fn apply_batch(
    prev: Arc<EnrichedSession>,
    batch: Vec<ParsedMessage>,
    ctx: &mut IncrementalContext,
) -> Arc<EnrichedSession> {
    if batch.is_empty() {
        return prev;
    }

    let mut next = (*prev).clone();
    let mut current_turn_index = next.turns.last().map(|t| t.turn_index).unwrap_or(0);

    for mut msg in batch {
        match &mut msg {
            ParsedMessage::UserPrompt {
                is_meta,
                uuid,
                text,
                ..
            } => {
                if !*is_meta {
                    current_turn_index += 1;
                    next.turns.push(Turn {
                        turn_index: current_turn_index,
                        prompt_text: text.clone(),
                        prompt_uuid: uuid.clone(),
                        duration_ms: None,
                        response_count: 0,
                        tool_use_count: 0,
                    });
                }
            }
            ParsedMessage::AssistantBlock {
                message_id,
                model,
                usage,
                turn_index,
                block,
                line_index,
                ..
            } => {
                *turn_index = current_turn_index;
                let first_seen = ctx.seen_message_ids.insert(message_id.clone());

                if first_seen {
                    next.responses.push(ReconstitutedResponse {
                        message_id: message_id.clone(),
                        turn_index: current_turn_index,
                        model: model.clone(),
                        usage: usage.clone(),
                        blocks: vec![block.clone()],
                        line_index_start: *line_index,
                        line_index_end: *line_index,
                    });
                    apply_usage_delta(&mut next.totals, None, usage, model.as_deref(), ctx);
                    if let Some(turn) = next
                        .turns
                        .iter_mut()
                        .rev()
                        .find(|t| t.turn_index == current_turn_index)
                    {
                        turn.response_count += 1;
                    }
                } else if let Some(existing) = next
                    .responses
                    .iter_mut()
                    .find(|r| &r.message_id == message_id)
                {
                    apply_usage_delta(
                        &mut next.totals,
                        Some(&existing.usage),
                        usage,
                        model.as_deref(),
                        ctx,
                    );
                    existing.usage = usage.clone();
                    existing.blocks.push(block.clone());
                    existing.line_index_end = *line_index;
                }

                if block.is_tool_use() {
                    if let Some(turn) = next
                        .turns
                        .iter_mut()
                        .rev()
                        .find(|t| t.turn_index == current_turn_index)
                    {
                        turn.tool_use_count += 1;
                    }
                    next.totals.tool_use_count += 1;

                    let id = block.tool_use_id().unwrap_or_default().to_string();
                    let name = block.tool_name().unwrap_or("unknown").to_string();
                    ctx.tool_use_id_to_name.insert(id.clone(), name.clone());

                    match next.tool_stats.iter_mut().find(|s| s.tool_name == name) {
                        Some(stat) => stat.call_count += 1,
                        None => next.tool_stats.push(ToolStat {
                            tool_name: name.clone(),
                            call_count: 1,
                            error_count: 0,
                            error_samples: Vec::new(),
                        }),
                    }

                    next.tool_calls.push(PairedToolCall {
                        tool_use_id: id,
                        tool_name: name,
                        turn_index: current_turn_index,
                        input: block.0.get("input").cloned().unwrap_or(serde_json::Value::Null),
                        tool_result_block: None,
                    });
                }
            }
            ParsedMessage::UserToolResult { results, .. } => {
                for result in results.iter() {
                    let Some(id) = result.tool_use_id.clone() else {
                        continue;
                    };
                    let result_ref = crate::session::ToolResultRef {
                        tool_use_id: Some(id.clone()),
                        is_error: result.is_error,
                        text: result.text.clone(),
                    };
                    if let Some(call) = next
                        .tool_calls
                        .iter_mut()
                        .find(|c| c.tool_use_id == id && c.tool_result_block.is_none())
                    {
                        call.tool_result_block = Some(result_ref);
                    }

                    if result.is_error {
                        if let Some(name) = ctx.tool_use_id_to_name.get(&id) {
                            if let Some(stat) = next.tool_stats.iter_mut().find(|s| &s.tool_name == name) {
                                stat.error_count += 1;
                                stat.error_samples.push(ErrorSample {
                                    tool_use_id: Some(id.clone()),
                                    error_text: result.text.clone(),
                                    turn_index: current_turn_index,
                                });
                            }
                        }
                    }
                }
            }
            ParsedMessage::SystemTurnDuration { duration_ms, .. } => {
                if let Some(turn) = next.turns.last_mut() {
                    turn.duration_ms = Some(*duration_ms);
                }
            }
            ParsedMessage::ProgressAgent {
                agent_id,
                parent_tool_use_id,
                prompt,
                ..
            } => {
                next.subagents.push(crate::session::SubagentRef {
                    prompt: prompt.clone(),
                    agent_id: agent_id.clone(),
                    parent_tool_use_id: parent_tool_use_id.clone(),
                    stats: None,
                });
            }
            _ => {}
        }

        next.messages.push(msg);
    }

    next.totals.total_tokens = next.totals.input_tokens
        + next.totals.output_tokens
        + next.totals.cache_creation_input_tokens
        + next.totals.cache_read_input_tokens;

    rebuild_context_snapshots(&mut next);

    Arc::new(next)
}

/// Add the delta between `before` (the response's previous usage, if any)
/// and `after` (its new usage) to the running totals, including an exact
/// per-response cost delta under the pricing table.
fn apply_usage_delta(
    totals: &mut crate::session::TokenTotals,
    before: Option<&crate::schemas::Usage>,
    after: &crate::schemas::Usage,
    model: Option<&str>,
    ctx: &IncrementalContext,
) {
    let zero = crate::schemas::Usage::default();
    let before = before.unwrap_or(&zero);

    totals.input_tokens += after.input_tokens.saturating_sub(before.input_tokens);
    totals.output_tokens += after.output_tokens.saturating_sub(before.output_tokens);
    totals.cache_creation_input_tokens += after
        .cache_creation_input_tokens
        .saturating_sub(before.cache_creation_input_tokens);
    totals.cache_read_input_tokens += after
        .cache_read_input_tokens
        .saturating_sub(before.cache_read_input_tokens);

    if model.is_some() {
        let delta_cost = pricing::cost(after, model) - pricing::cost(before, model);
        totals.estimated_cost_usd += delta_cost;
    } else if ctx.cost_per_token > 0.0 {
        let delta_tokens = (after.input_tokens + after.output_tokens)
            .saturating_sub(before.input_tokens + before.output_tokens);
        totals.estimated_cost_usd += delta_tokens as f64 * ctx.cost_per_token;
    }
}

fn rebuild_context_snapshots(session: &mut EnrichedSession) {
    session.context_snapshots.clear();
    let mut cumulative_input = 0u64;
    let mut cumulative_output = 0u64;
    for response in &session.responses {
        cumulative_input += response.usage.input_tokens + response.usage.cache_read_input_tokens;
        cumulative_output += response.usage.output_tokens;
        session.context_snapshots.push(ContextSnapshot {
            message_id: response.message_id.clone(),
            cumulative_input_tokens: cumulative_input,
            cumulative_output_tokens: cumulative_output,
        });
    }
}
