//! The non-streaming turn loop and handoff state machine.

use std::sync::Arc;

use agent_tasks::TaskStore;
use agent_types::{Hooks, Model, RunConfig, RunInput, RunResult, ToolContext};

use crate::agent::AgentRegistry;
use crate::assembler::assemble_request;
use crate::error::LoopError;
use crate::step::{TurnOutcome, TurnState, classify_and_apply};

const NUDGE_MESSAGE: &str =
    "Now that you have the information from the tool(s), please provide a complete response to my original question.";

/// Run a conversation to completion against a single model.
///
/// `max_turns` bounds the number of model calls: `raw_responses.len() <=
/// max_turns` always holds. `tasks` is shared task/delegation
/// state; callers that want isolated runs pass a fresh [`TaskStore`].
#[allow(clippy::too_many_arguments)]
pub async fn run<M: Model>(
    registry: &AgentRegistry,
    starting_agent: &str,
    model: &M,
    input: RunInput,
    run_config: &RunConfig,
    max_turns: usize,
    tasks: &TaskStore,
    run_hooks: &[Arc<dyn Hooks>],
    tool_ctx: &ToolContext,
) -> Result<RunResult, LoopError> {
    let is_anthropic = run_config
        .provider
        .as_deref()
        .map(|p| p.to_lowercase().contains("anthropic"))
        .unwrap_or(false);

    let mut result = RunResult::new(input.clone(), starting_agent);
    let mut state = TurnState {
        current_agent: starting_agent.to_string(),
        input,
        consecutive_tool_calls: 0,
    };

    for hook in run_hooks {
        hook.on_run_start().await?;
    }

    let mut last_content: Option<String> = None;
    let mut agent_started = false;

    for turn in 0..max_turns {
        if tool_ctx.is_cancelled() {
            return Err(LoopError::Cancelled);
        }

        let agent = registry
            .get(&state.current_agent)
            .ok_or_else(|| LoopError::HandoffAgentNotFound(state.current_agent.clone()))?;

        if !agent_started {
            for hook in run_hooks.iter().chain(agent.hooks.iter()) {
                hook.on_agent_start(&agent.name).await?;
            }
            agent_started = true;
        }

        for hook in run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_turn_start(turn, &agent.name).await?;
        }

        if state.consecutive_tool_calls >= 3 {
            state.input.push_item(serde_json::json!({
                "role": "user",
                "content": NUDGE_MESSAGE,
            }));
        }

        let request = assemble_request(
            &agent,
            state.input.clone(),
            run_config,
            state.consecutive_tool_calls,
            true,
        );

        for hook in run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_before_model_call(&agent.name, &request).await?;
        }

        let response = model.get_response(request).await?;
        last_content = response.content.clone().or(last_content);

        let outcome = classify_and_apply(
            response,
            &agent,
            registry,
            tasks,
            tool_ctx,
            run_hooks,
            is_anthropic,
            &mut state,
            &mut result,
        )
        .await?;

        for hook in run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_turn_end(turn, &agent.name, result.raw_responses.last().expect("just pushed")).await?;
        }

        if state.current_agent != agent.name {
            for hook in run_hooks.iter().chain(agent.hooks.iter()) {
                hook.on_agent_end(&agent.name).await?;
            }
            agent_started = false;
        }

        if let TurnOutcome::Done = outcome {
            for hook in run_hooks.iter().chain(agent.hooks.iter()) {
                hook.on_agent_end(&agent.name).await?;
            }
            for hook in run_hooks {
                hook.on_run_end(&result).await?;
            }
            return Ok(result);
        }
    }

    // Turn exhaustion: report the last content seen (possibly none) rather
    // than failing outright.
    if agent_started {
        if let Some(agent) = registry.get(&state.current_agent) {
            for hook in run_hooks.iter().chain(agent.hooks.iter()) {
                hook.on_agent_end(&agent.name).await?;
            }
        }
    }
    result.last_agent = state.current_agent.clone();
    result.set_final_output(last_content);
    for hook in run_hooks {
        hook.on_run_end(&result).await?;
    }
    Ok(result)
}
