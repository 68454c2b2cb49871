//! Step-by-step iteration over the turn loop.
//!
//! [`StepIterator`] drives [`crate::engine::run`]'s same turn logic one turn
//! at a time so a caller can inspect intermediate state and inject
//! additional input between turns, without re-running the whole loop.

use std::sync::Arc;

use agent_tasks::TaskStore;
use agent_types::{Hooks, Model, RunConfig, RunInput, RunResult, ToolContext};

use crate::agent::AgentRegistry;
use crate::assembler::assemble_request;
use crate::error::LoopError;
use crate::step::{TurnOutcome, TurnState, classify_and_apply};

/// What happened on one call to [`StepIterator::next`].
pub enum StepResult {
    /// The loop is still running; more turns remain.
    Continue,
    /// The run reached a terminal state. No further calls to `next` will
    /// make progress.
    Done,
    /// `max_turns` was reached without a terminal state.
    MaxTurnsReached,
}

/// Drives the turn loop one turn at a time.
///
/// Created via [`StepIterator::new`]. Each call to [`next`](Self::next)
/// performs exactly one model call and applies its effects (classification
/// and state transition), then returns control to the caller.
pub struct StepIterator<'a, M: Model> {
    registry: &'a AgentRegistry,
    model: &'a M,
    run_config: &'a RunConfig,
    max_turns: usize,
    tasks: &'a TaskStore,
    run_hooks: &'a [Arc<dyn Hooks>],
    tool_ctx: &'a ToolContext,
    is_anthropic: bool,
    state: TurnState,
    turn: usize,
    finished: bool,
    agent_started: bool,
    result: RunResult,
}

impl<'a, M: Model> StepIterator<'a, M> {
    /// Build a new step iterator starting at `starting_agent` with `input`.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        registry: &'a AgentRegistry,
        starting_agent: &str,
        model: &'a M,
        input: RunInput,
        run_config: &'a RunConfig,
        max_turns: usize,
        tasks: &'a TaskStore,
        run_hooks: &'a [Arc<dyn Hooks>],
        tool_ctx: &'a ToolContext,
    ) -> Self {
        let is_anthropic = run_config
            .provider
            .as_deref()
            .map(|p| p.to_lowercase().contains("anthropic"))
            .unwrap_or(false);
        let result = RunResult::new(input.clone(), starting_agent);
        Self {
            registry,
            model,
            run_config,
            max_turns,
            tasks,
            run_hooks,
            tool_ctx,
            is_anthropic,
            state: TurnState { current_agent: starting_agent.to_string(), input, consecutive_tool_calls: 0 },
            turn: 0,
            finished: false,
            agent_started: false,
            result,
        }
    }

    /// Inject an extra input item ahead of the next model call.
    pub fn inject_input(&mut self, item: serde_json::Value) {
        self.state.input.push_item(item);
    }

    /// The agent whose turn is next.
    #[must_use]
    pub fn current_agent(&self) -> &str {
        &self.state.current_agent
    }

    /// The accumulated result so far (final output is only set once `Done`
    /// has been returned).
    #[must_use]
    pub fn result(&self) -> &RunResult {
        &self.result
    }

    /// Consume the iterator and return the final accumulated result.
    #[must_use]
    pub fn into_result(self) -> RunResult {
        self.result
    }

    /// Advance the loop by one turn.
    pub async fn next(&mut self) -> Result<StepResult, LoopError> {
        if self.finished {
            return Ok(StepResult::Done);
        }
        if self.turn >= self.max_turns {
            self.finished = true;
            if self.agent_started {
                if let Some(agent) = self.registry.get(&self.state.current_agent) {
                    for hook in self.run_hooks.iter().chain(agent.hooks.iter()) {
                        hook.on_agent_end(&agent.name).await?;
                    }
                }
                self.agent_started = false;
            }
            self.result.last_agent = self.state.current_agent.clone();
            return Ok(StepResult::MaxTurnsReached);
        }

        let agent = self
            .registry
            .get(&self.state.current_agent)
            .ok_or_else(|| LoopError::HandoffAgentNotFound(self.state.current_agent.clone()))?;

        if !self.agent_started {
            for hook in self.run_hooks.iter().chain(agent.hooks.iter()) {
                hook.on_agent_start(&agent.name).await?;
            }
            self.agent_started = true;
        }

        for hook in self.run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_turn_start(self.turn, &agent.name).await?;
        }

        let request = assemble_request(&agent, self.state.input.clone(), self.run_config, self.state.consecutive_tool_calls, true);

        for hook in self.run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_before_model_call(&agent.name, &request).await?;
        }

        let response = self.model.get_response(request).await?;

        let outcome = classify_and_apply(
            response,
            &agent,
            self.registry,
            self.tasks,
            self.tool_ctx,
            self.run_hooks,
            self.is_anthropic,
            &mut self.state,
            &mut self.result,
        )
        .await?;

        for hook in self.run_hooks.iter().chain(agent.hooks.iter()) {
            hook.on_turn_end(self.turn, &agent.name, self.result.raw_responses.last().expect("just pushed")).await?;
        }

        self.turn += 1;

        if self.state.current_agent != agent.name {
            for hook in self.run_hooks.iter().chain(agent.hooks.iter()) {
                hook.on_agent_end(&agent.name).await?;
            }
            self.agent_started = false;
        }

        match outcome {
            TurnOutcome::Done => {
                self.finished = true;
                if self.agent_started {
                    for hook in self.run_hooks.iter().chain(agent.hooks.iter()) {
                        hook.on_agent_end(&agent.name).await?;
                    }
                    self.agent_started = false;
                }
                Ok(StepResult::Done)
            }
            TurnOutcome::Continue => Ok(StepResult::Continue),
        }
    }
}
