//! Single forward pass over a session's parsed messages, producing the
//! derived aggregates (`EnrichedSession`) the dashboard renders from.
//! Pure: no I/O, and no dependence on wall-clock time.

use std::collections::{HashMap, VecDeque};

use crate::message::ParsedMessage;
use crate::pricing;
use crate::session::{
    ContextSnapshot, EnrichedSession, ErrorSample, PairedToolCall, ReconstitutedResponse, ToolStat,
    Turn,
};

struct ToolUseOccurrence {
    tool_use_id: String,
    tool_name: String,
    turn_index: u32,
    input: serde_json::Value,
}

pub fn enrich_session(messages: Vec<ParsedMessage>) -> EnrichedSession {
    let mut session = EnrichedSession::default();

    let mut current_turn_index: u32 = 0;
    let mut responses_order: Vec<String> = Vec::new();
    let mut responses_by_id: HashMap<String, ReconstitutedResponse> = HashMap::new();
    let mut tool_use_id_to_name: HashMap<String, String> = HashMap::new();
    let mut tool_stats_order: Vec<String> = Vec::new();
    let mut tool_stats: HashMap<String, ToolStat> = HashMap::new();
    let mut tool_use_occurrences: Vec<ToolUseOccurrence> = Vec::new();
    let mut results_by_tool_use_id: HashMap<String, VecDeque<crate::session::ToolResultRef>> =
        HashMap::new();

    for mut msg in messages {
        match &mut msg {
            ParsedMessage::UserPrompt {
                is_meta,
                uuid,
                text,
                ..
            } => {
                if !*is_meta {
                    current_turn_index += 1;
                    session.turns.push(Turn {
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

                match responses_by_id.get_mut(message_id) {
                    None => {
                        responses_order.push(message_id.clone());
                        responses_by_id.insert(
                            message_id.clone(),
                            ReconstitutedResponse {
                                message_id: message_id.clone(),
                                turn_index: current_turn_index,
                                model: model.clone(),
                                usage: usage.clone(),
                                blocks: vec![block.clone()],
                                line_index_start: *line_index,
                                line_index_end: *line_index,
                            },
                        );
                        if let Some(turn) = session
                            .turns
                            .iter_mut()
                            .rev()
                            .find(|t| t.turn_index == current_turn_index)
                        {
                            turn.response_count += 1;
                        }
                    }
                    Some(existing) => {
                        existing.usage = usage.clone();
                        existing.blocks.push(block.clone());
                        existing.line_index_end = *line_index;
                    }
                }

                if block.is_tool_use() {
                    if let Some(turn) = session
                        .turns
                        .iter_mut()
                        .rev()
                        .find(|t| t.turn_index == current_turn_index)
                    {
                        turn.tool_use_count += 1;
                    }
                    session.totals.tool_use_count += 1;

                    let id = block.tool_use_id().unwrap_or_default().to_string();
                    let name = block.tool_name().unwrap_or("unknown").to_string();

                    if !tool_stats.contains_key(&name) {
                        tool_stats_order.push(name.clone());
                        tool_stats.insert(
                            name.clone(),
                            ToolStat {
                                tool_name: name.clone(),
                                call_count: 0,
                                error_count: 0,
                                error_samples: Vec::new(),
                            },
                        );
                    }
                    tool_stats.get_mut(&name).unwrap().call_count += 1;

                    tool_use_id_to_name.insert(id.clone(), name.clone());
                    tool_use_occurrences.push(ToolUseOccurrence {
                        tool_use_id: id,
                        tool_name: name,
                        turn_index: current_turn_index,
                        input: block.0.get("input").cloned().unwrap_or(serde_json::Value::Null),
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
                    results_by_tool_use_id
                        .entry(id.clone())
                        .or_default()
                        .push_back(result_ref);

                    if let Some(name) = tool_use_id_to_name.get(&id) {
                        if result.is_error {
                            if let Some(stat) = tool_stats.get_mut(name) {
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
                if let Some(turn) = session.turns.last_mut() {
                    turn.duration_ms = Some(*duration_ms);
                }
            }
            ParsedMessage::ProgressAgent {
                agent_id,
                parent_tool_use_id,
                prompt,
                ..
            } => {
                session.subagents.push(crate::session::SubagentRef {
                    prompt: prompt.clone(),
                    agent_id: agent_id.clone(),
                    parent_tool_use_id: parent_tool_use_id.clone(),
                    stats: None,
                });
            }
            _ => {}
        }

        session.messages.push(msg);
    }

    // Totals and context snapshots are derived once, after last-wins usage
    // has settled, directly from the ordered response map.
    let mut cumulative_input = 0u64;
    let mut cumulative_output = 0u64;
    for id in &responses_order {
        let response = &responses_by_id[id];
        session.totals.input_tokens += response.usage.input_tokens;
        session.totals.output_tokens += response.usage.output_tokens;
        session.totals.cache_creation_input_tokens += response.usage.cache_creation_input_tokens;
        session.totals.cache_read_input_tokens += response.usage.cache_read_input_tokens;
        session.totals.estimated_cost_usd += pricing::cost(&response.usage, response.model.as_deref());

        cumulative_input += response.usage.input_tokens + response.usage.cache_read_input_tokens;
        cumulative_output += response.usage.output_tokens;
        session.context_snapshots.push(ContextSnapshot {
            message_id: id.clone(),
            cumulative_input_tokens: cumulative_input,
            cumulative_output_tokens: cumulative_output,
        });

        session.responses.push(responses_by_id[id].clone());
    }
    session.totals.total_tokens = session.totals.input_tokens
        + session.totals.output_tokens
        + session.totals.cache_creation_input_tokens
        + session.totals.cache_read_input_tokens;

    for name in &tool_stats_order {
        session.tool_stats.push(tool_stats[name].clone());
    }

    for occurrence in tool_use_occurrences {
        let tool_result_block = results_by_tool_use_id
            .get_mut(&occurrence.tool_use_id)
            .and_then(VecDeque::pop_front);
        session.tool_calls.push(PairedToolCall {
            tool_use_id: occurrence.tool_use_id,
            tool_name: occurrence.tool_name,
            turn_index: occurrence.turn_index,
            input: occurrence.input,
            tool_result_block,
        });
    }

    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn enrich_lines(lines: &[&str]) -> EnrichedSession {
        let messages: Vec<ParsedMessage> = lines
            .iter()
            .enumerate()
            .flat_map(|(i, l)| parse_line(l, i))
            .collect();
        enrich_session(messages)
    }

    #[test]
    fn turn_counting_ignores_meta_prompts() {
        let lines = [
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":"first"}}"#,
            r#"{"type":"user","uuid":"u2","isMeta":true,"message":{"role":"user","content":"meta"}}"#,
            r#"{"type":"user","uuid":"u3","message":{"role":"user","content":"second"}}"#,
            r#"{"type":"user","uuid":"u4","isMeta":true,"message":{"role":"user","content":"meta2"}}"#,
            r#"{"type":"user","uuid":"u5","message":{"role":"user","content":"third"}}"#,
        ];
        let enriched = enrich_lines(&lines);
        assert_eq!(enriched.turns.len(), 3);
        for (i, turn) in enriched.turns.iter().enumerate() {
            assert_eq!(turn.turn_index, (i + 1) as u32);
        }
    }

    #[test]
    fn last_wins_usage_across_split_assistant_lines() {
        let lines = [
            r#"{"type":"assistant","message":{"id":"msg-A","model":"claude-3-5-sonnet","content":[{"type":"text","text":"a"}],"usage":{"input_tokens":100,"output_tokens":10}}}"#,
            r#"{"type":"assistant","message":{"id":"msg-A","model":"claude-3-5-sonnet","content":[{"type":"text","text":"b"}],"usage":{"input_tokens":100,"output_tokens":30}}}"#,
            r#"{"type":"assistant","message":{"id":"msg-A","model":"claude-3-5-sonnet","content":[{"type":"text","text":"c"}],"usage":{"input_tokens":100,"output_tokens":50}}}"#,
        ];
        let enriched = enrich_lines(&lines);
        assert_eq!(enriched.responses.len(), 1);
        assert_eq!(enriched.responses[0].usage.output_tokens, 50);
        assert_eq!(enriched.totals.output_tokens, 50);
    }

    #[test]
    fn tool_error_attribution() {
        let lines = [
            r#"{"type":"assistant","message":{"id":"msg-A","model":"claude-3-5-sonnet","content":[{"type":"tool_use","id":"t1","name":"Bash","input":{}}],"usage":{"input_tokens":1,"output_tokens":1}}}"#,
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1","is_error":true,"content":"boom"}]}}"#,
        ];
        let enriched = enrich_lines(&lines);
        assert_eq!(enriched.tool_stats.len(), 1);
        let stat = &enriched.tool_stats[0];
        assert_eq!(stat.tool_name, "Bash");
        assert_eq!(stat.call_count, 1);
        assert_eq!(stat.error_count, 1);
        assert_eq!(stat.error_samples.len(), 1);
        assert_eq!(stat.error_samples[0].tool_use_id.as_deref(), Some("t1"));
        assert_eq!(stat.error_samples[0].error_text, "boom");
    }

    #[test]
    fn unknown_model_costs_nothing_but_tokens_count() {
        let lines = [
            r#"{"type":"assistant","message":{"id":"msg-A","model":"some-future-model","content":[{"type":"text","text":"hi"}],"usage":{"input_tokens":10,"output_tokens":5}}}"#,
        ];
        let enriched = enrich_lines(&lines);
        assert_eq!(enriched.totals.estimated_cost_usd, 0.0);
        assert_eq!(enriched.totals.total_tokens, 15);
    }

    #[test]
    fn meta_only_prompts_yield_no_turns_and_no_first_prompt() {
        let lines = [
            r#"{"type":"user","uuid":"u1","isMeta":true,"message":{"role":"user","content":"setup"}}"#,
        ];
        let enriched = enrich_lines(&lines);
        assert!(enriched.turns.is_empty());
    }

    #[test]
    fn paired_tool_call_links_result() {
        let lines = [
            r#"{"type":"assistant","message":{"id":"msg-A","model":"claude-3-5-sonnet","content":[{"type":"tool_use","id":"t1","name":"Read","input":{"path":"a"}}],"usage":{"input_tokens":1,"output_tokens":1}}}"#,
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1","is_error":false,"content":"contents"}]}}"#,
        ];
        let enriched = enrich_lines(&lines);
        assert_eq!(enriched.tool_calls.len(), 1);
        let call = &enriched.tool_calls[0];
        assert_eq!(call.tool_use_id, "t1");
        assert!(call.tool_result_block.is_some());
    }

    #[test]
    fn unpaired_tool_call_has_no_result_block() {
        let lines = [
            r#"{"type":"assistant","message":{"id":"msg-A","model":"claude-3-5-sonnet","content":[{"type":"tool_use","id":"t1","name":"Read","input":{}}],"usage":{"input_tokens":1,"output_tokens":1}}}"#,
        ];
        let enriched = enrich_lines(&lines);
        assert_eq!(enriched.tool_calls.len(), 1);
        assert!(enriched.tool_calls[0].tool_result_block.is_none());
    }

    #[test]
    fn context_snapshots_are_monotonically_non_decreasing() {
        let lines = [
            r#"{"type":"assistant","message":{"id":"msg-A","model":"claude-3-5-sonnet","content":[{"type":"text","text":"a"}],"usage":{"input_tokens":10,"output_tokens":5}}}"#,
            r#"{"type":"assistant","message":{"id":"msg-B","model":"claude-3-5-sonnet","content":[{"type":"text","text":"b"}],"usage":{"input_tokens":20,"output_tokens":7}}}"#,
        ];
        let enriched = enrich_lines(&lines);
        assert_eq!(enriched.context_snapshots.len(), 2);
        assert!(
            enriched.context_snapshots[1].cumulative_input_tokens
                >= enriched.context_snapshots[0].cumulative_input_tokens
        );
    }
}
