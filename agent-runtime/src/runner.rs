//! The top-level public entry point: wires an [`AgentRegistry`], a
//! [`TaskStore`], a [`HookRegistry`], and a model together behind `run`,
//! `run_streamed`, and `run_step`.

use std::sync::Arc;

use agent_loop::{AgentRegistry, StepIterator};
use agent_tasks::TaskStore;
use agent_types::{Hooks, Model, RunConfig, RunInput, RunResult, StreamEvent, ToolContext};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::RunError;
use crate::hooks::HookRegistry;

/// Per-run options: everything besides the starting agent and model that
/// shapes a single run.
pub struct RunOptions {
    /// Bounds the number of model calls a single run may make.
    pub max_turns: usize,
    /// Run-wide model/provider configuration.
    pub run_config: RunConfig,
    /// Lifecycle hooks fired for every agent in the run.
    pub hooks: Arc<dyn Hooks>,
    /// Cooperative cancellation, checked at each suspension point.
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_turns: 10,
            run_config: RunConfig::default(),
            hooks: Arc::new(HookRegistry::new()),
            cancel: CancellationToken::new(),
        }
    }
}

/// Ties an [`AgentRegistry`] to a [`TaskStore`] and a [`ToolContext`],
/// exposing the turn loop's three entry points.
pub struct Runner {
    registry: Arc<AgentRegistry>,
    tasks: Arc<TaskStore>,
    tool_ctx: Arc<ToolContext>,
}

impl Runner {
    /// Build a runner over `registry`, with a fresh [`TaskStore`] and empty
    /// [`ToolContext`].
    #[must_use]
    pub fn new(registry: AgentRegistry) -> Self {
        Self { registry: Arc::new(registry), tasks: Arc::new(TaskStore::new()), tool_ctx: Arc::new(ToolContext::new()) }
    }

    /// Build a runner that shares an existing [`TaskStore`] across runs
    /// (e.g. several runs cooperating on the same delegation graph).
    #[must_use]
    pub fn with_shared_task_store(registry: AgentRegistry, tasks: Arc<TaskStore>) -> Self {
        Self { registry: Arc::new(registry), tasks, tool_ctx: Arc::new(ToolContext::new()) }
    }

    /// Attach values tools on this run's agents will read from their
    /// [`ToolContext`].
    #[must_use]
    pub fn with_tool_context(mut self, tool_ctx: ToolContext) -> Self {
        self.tool_ctx = Arc::new(tool_ctx);
        self
    }

    /// Run `starting_agent` to completion against `model`.
    pub async fn run<M: Model>(
        &self,
        starting_agent: &str,
        model: &M,
        input: RunInput,
        options: &RunOptions,
    ) -> Result<RunResult, RunError> {
        let tool_ctx = (*self.tool_ctx).clone().with_cancel(options.cancel.clone());
        let run_hooks = [options.hooks.clone()];
        tokio::select! {
            () = options.cancel.cancelled() => Err(RunError::Cancelled),
            result = agent_loop::engine::run(
                &self.registry,
                starting_agent,
                model,
                input,
                &options.run_config,
                options.max_turns,
                &self.tasks,
                &run_hooks,
                &tool_ctx,
            ) => Ok(result?),
        }
    }

    /// Run `starting_agent` as a streaming pipeline, returning a bounded
    /// channel of [`StreamEvent`]s.
    pub fn run_streamed<M: Model + 'static>(
        &self,
        starting_agent: &str,
        model: Arc<M>,
        input: RunInput,
        options: &RunOptions,
    ) -> mpsc::Receiver<StreamEvent> {
        let tool_ctx = Arc::new((*self.tool_ctx).clone().with_cancel(options.cancel.clone()));
        agent_loop::stream::run_streamed(
            self.registry.clone(),
            starting_agent.to_string(),
            model,
            input,
            options.run_config.clone(),
            options.max_turns,
            self.tasks.clone(),
            vec![options.hooks.clone()],
            tool_ctx,
            options.cancel.clone(),
        )
    }

    /// Drive `starting_agent` one turn at a time via a [`StepIterator`].
    #[must_use]
    pub fn run_step<'a, M: Model>(
        &'a self,
        starting_agent: &str,
        model: &'a M,
        input: RunInput,
        options: &'a RunOptions,
        run_hooks: &'a [Arc<dyn Hooks>],
    ) -> StepIterator<'a, M> {
        StepIterator::new(&self.registry, starting_agent, model, input, &options.run_config, options.max_turns, &self.tasks, run_hooks, &self.tool_ctx)
    }

    /// The shared task store backing this runner's delegation graph.
    #[must_use]
    pub fn tasks(&self) -> &Arc<TaskStore> {
        &self.tasks
    }
}

/// Re-exported for callers that want to match on step outcomes without
/// importing `agent_loop` directly.
pub use agent_loop::StepResult as RunnerStepResult;
