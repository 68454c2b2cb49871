//! The per-turn classification and state transition, shared between the
//! plain [`crate::engine`] loop and the [`crate::stream`] pipeline's
//! synthesized-response path so both honor the same semantics.

use std::sync::Arc;

use agent_tasks::TaskStore;
use agent_types::{Hooks, ModelResponse, RunItem, RunResult, ToolContext};
use serde_json::{Value, json};

use crate::agent::{Agent, AgentRegistry};
use crate::error::LoopError;
use crate::handoff::apply_handoff;

/// Mutable loop state threaded through successive turns.
pub struct TurnState {
    /// The agent whose turn is next.
    pub current_agent: String,
    /// The input that agent will see.
    pub input: agent_types::RunInput,
    /// Consecutive turns that produced exactly one tool call.
    pub consecutive_tool_calls: usize,
}

/// What the caller's loop should do after a turn was classified.
pub enum TurnOutcome {
    /// Keep looping; `state` has already been updated in place.
    Continue,
    /// The run reached a terminal state.
    Done,
}

/// Classify one model response and apply its effects: structured output,
/// handoff, tool dispatch, or plain content, in that priority order.
#[allow(clippy::too_many_arguments)]
pub async fn classify_and_apply(
    response: ModelResponse,
    agent: &Agent,
    registry: &AgentRegistry,
    tasks: &TaskStore,
    tool_ctx: &ToolContext,
    run_hooks: &[Arc<dyn Hooks>],
    is_anthropic_provider: bool,
    state: &mut TurnState,
    result: &mut RunResult,
) -> Result<TurnOutcome, LoopError> {
    for hook in run_hooks.iter().chain(agent.hooks.iter()) {
        hook.on_after_model_call(&agent.name, &response).await?;
    }
    if let Some(usage) = &response.usage {
        result.usage.accumulate(usage);
    }
    result.raw_responses.push(response.clone());

    if agent.output_schema.is_some() {
        result.set_final_output(response.content.clone());
        result.last_agent = agent.name.clone();
        return Ok(TurnOutcome::Done);
    }

    if let Some(handoff) = response.handoff.clone() {
        for hook in run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_before_handoff(&agent.name, &handoff.agent).await?;
        }
        let transition = apply_handoff(&handoff, agent, registry, tasks).await?;
        result.new_items.push(RunItem::Handoff {
            agent: transition.agent.clone(),
            input: transition.input.as_text(),
        });
        for hook in run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_after_handoff(&agent.name, &transition.agent).await?;
        }
        state.current_agent = transition.agent;
        state.input = transition.input;
        state.consecutive_tool_calls = 0;
        return Ok(TurnOutcome::Continue);
    }

    if !response.tool_calls.is_empty() {
        let assistant_content = response
            .content
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| format!("You called the tool: {}", response.tool_calls[0].name));

        let mut items = state.input.clone().into_items();
        items.push(json!({
            "role": "assistant",
            "content": assistant_content,
            "tool_calls": response.tool_calls,
        }));

        for call in &response.tool_calls {
            if tool_ctx.is_cancelled() {
                return Err(LoopError::Cancelled);
            }
            let id = call.id.clone().unwrap_or_else(generate_call_id);
            for hook in run_hooks.iter().chain(agent.hooks.iter()) {
                hook.on_before_tool_call(&agent.name, &call.name, &call.parameters).await?;
            }
            let output = agent.tools.invoke(&call.name, call.parameters.clone(), tool_ctx).await;
            for hook in run_hooks.iter().chain(agent.hooks.iter()) {
                hook.on_after_tool_call(&agent.name, &call.name, &output).await?;
            }

            result.new_items.push(RunItem::ToolCall {
                name: call.name.clone(),
                parameters: call.parameters.clone(),
            });
            result.new_items.push(RunItem::ToolResult {
                name: call.name.clone(),
                result: output.content.clone(),
            });
            items.push(tool_result_item(is_anthropic_provider, &call.name, &id, &call.parameters, &output.content));
        }

        state.input = agent_types::RunInput::Items(items);
        state.consecutive_tool_calls = if response.tool_calls.len() == 1 {
            state.consecutive_tool_calls + 1
        } else {
            0
        };
        return Ok(TurnOutcome::Continue);
    }

    if let Some(content) = response.content.as_ref().filter(|c| !c.is_empty()) {
        result.set_final_output(Some(content.clone()));
        result.last_agent = agent.name.clone();
        state.consecutive_tool_calls = 0;
        return Ok(TurnOutcome::Done);
    }

    Ok(TurnOutcome::Continue)
}

/// Synthesize a fresh `call_<16-hex>` id for a tool call the model didn't
/// supply one for.
fn generate_call_id() -> String {
    format!("call_{:016x}", rand::random::<u64>())
}

/// The standard or Anthropic-flavored tool-result wire item.
fn tool_result_item(is_anthropic: bool, name: &str, id: &str, parameters: &Value, content: &str) -> Value {
    if is_anthropic {
        json!({
            "role": "tool",
            "tool_call_id": id,
            "content": content,
        })
    } else {
        json!({
            "type": "tool_result",
            "tool_call": { "name": name, "id": id, "parameters": parameters },
            "tool_result": { "content": content },
        })
    }
}
