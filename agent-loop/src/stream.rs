//! The streaming pipeline: the same state machine as [`crate::engine`], but
//! events are forwarded live and a `ModelResponse` is synthesized from the
//! buffered stream once the provider signals `Done`.

use std::sync::Arc;

use agent_tasks::TaskStore;
use agent_types::{
    Hooks, Model, ModelResponse, RunConfig, RunInput, RunResult, StreamError, StreamEvent, ToolContext, Usage,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::AgentRegistry;
use crate::assembler::assemble_request;
use crate::error::LoopError;
use crate::step::{TurnOutcome, TurnState, classify_and_apply};

const EVENT_CHANNEL_CAPACITY: usize = 100;
const NUDGE_MESSAGE: &str =
    "Now that you have the information from the tool(s), please provide a complete response to my original question.";

/// Run a conversation as a streaming pipeline, returning a bounded channel
/// of [`StreamEvent`]s. The producer is a single background task; the
/// caller drains the returned receiver.
#[allow(clippy::too_many_arguments)]
pub fn run_streamed<M: Model + 'static>(
    registry: Arc<AgentRegistry>,
    starting_agent: String,
    model: Arc<M>,
    input: RunInput,
    run_config: RunConfig,
    max_turns: usize,
    tasks: Arc<TaskStore>,
    run_hooks: Vec<Arc<dyn Hooks>>,
    tool_ctx: Arc<ToolContext>,
    cancel: CancellationToken,
) -> mpsc::Receiver<StreamEvent> {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        match drive(
            &registry,
            &starting_agent,
            model.as_ref(),
            input,
            &run_config,
            max_turns,
            &tasks,
            &run_hooks,
            &tool_ctx,
            &cancel,
            &tx,
        )
        .await
        {
            Ok(result) => {
                for hook in &run_hooks {
                    if hook.on_run_end(&result).await.is_err() {
                        break;
                    }
                }
                let _ = tx.send(StreamEvent::Done).await;
            }
            Err(err) => {
                let _ = tx.send(StreamEvent::Error(StreamError::non_retryable(err.to_string()))).await;
            }
        }
    });
    rx
}

#[allow(clippy::too_many_arguments)]
async fn drive<M: Model>(
    registry: &AgentRegistry,
    starting_agent: &str,
    model: &M,
    input: RunInput,
    run_config: &RunConfig,
    max_turns: usize,
    tasks: &TaskStore,
    run_hooks: &[Arc<dyn Hooks>],
    tool_ctx: &ToolContext,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<StreamEvent>,
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
        if cancel.is_cancelled() || tool_ctx.is_cancelled() {
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

        let request = assemble_request(&agent, state.input.clone(), run_config, state.consecutive_tool_calls, true);

        for hook in run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_before_model_call(&agent.name, &request).await?;
        }

        let mut provider_rx = model
            .stream_response(request)
            .await
            .map_err(LoopError::ModelCall)?;

        let response = match synthesize_response(&mut provider_rx, cancel, tx).await? {
            Some(response) => response,
            None => return Err(LoopError::Cancelled),
        };
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
    Ok(result)
}

/// Drain one turn's provider stream, forwarding `content`/`tool_call`/
/// `handoff` events verbatim and aggregating them into a single response
/// once `Done` arrives. Returns `Ok(None)` if cancelled mid-stream.
async fn synthesize_response(
    provider_rx: &mut mpsc::Receiver<StreamEvent>,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<Option<ModelResponse>, LoopError> {
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let mut handoff = None;
    let mut usage = None;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            event = provider_rx.recv() => event,
        };
        let Some(event) = event else {
            // The provider closed the channel without an explicit Done.
            break;
        };
        match event {
            StreamEvent::Content(chunk) => {
                content.push_str(&chunk);
                if tx.send(StreamEvent::Content(chunk)).await.is_err() {
                    return Ok(None);
                }
            }
            StreamEvent::ToolCall(call) => {
                if tx.send(StreamEvent::ToolCall(call.clone())).await.is_err() {
                    return Ok(None);
                }
                tool_calls.push(call);
            }
            StreamEvent::Handoff(call) => {
                if tx.send(StreamEvent::Handoff(call.clone())).await.is_err() {
                    return Ok(None);
                }
                handoff = Some(call);
            }
            StreamEvent::Usage(u) => {
                usage = Some(u);
            }
            StreamEvent::Done => break,
            StreamEvent::Error(err) => return Err(LoopError::ModelCall(agent_types::ProviderError::Provider(err.message))),
        }
    }

    Ok(Some(ModelResponse {
        content: (!content.is_empty()).then_some(content),
        tool_calls,
        handoff,
        usage: usage.or_else(|| Some(Usage::default())),
    }))
}
