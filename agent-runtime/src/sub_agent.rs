//! Programmatic sub-agent spawning.
//!
//! This sits alongside the model-driven handoff state machine in
//! `agent-loop`, not instead of it — it is for callers who want to invoke a
//! fixed sub-agent directly from application code rather than through a
//! model-requested handoff.

use std::collections::HashMap;
use std::sync::Arc;

use agent_loop::{Agent, AgentRegistry};
use agent_tasks::TaskStore;
use agent_tool::ToolRegistry;
use agent_types::{Model, RunConfig, RunInput, RunResult, ToolContext};

use crate::error::SubAgentError;

/// A named, preconfigured sub-agent: its own instructions, a filtered view
/// of a parent tool registry, and nesting limits.
pub struct SubAgentConfig {
    instructions: String,
    tool_names: Vec<String>,
    model_override: Option<String>,
    max_depth: usize,
    max_turns: usize,
}

impl SubAgentConfig {
    /// Start building a config with the given system instructions.
    #[must_use]
    pub fn new(instructions: impl Into<String>) -> Self {
        Self { instructions: instructions.into(), tool_names: Vec::new(), model_override: None, max_depth: 3, max_turns: 10 }
    }

    /// Restrict the sub-agent to this subset of the parent's tools by name.
    #[must_use]
    pub fn with_tools(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tool_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Override the model used for this sub-agent specifically.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Maximum nesting depth this sub-agent may be spawned at.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Maximum turns the sub-agent's own run may take.
    #[must_use]
    pub fn with_max_turns(mut self, turns: usize) -> Self {
        self.max_turns = turns;
        self
    }
}

/// Registers named [`SubAgentConfig`]s and spawns them against a shared
/// tool registry and task store.
pub struct SubAgentManager {
    configs: HashMap<String, SubAgentConfig>,
    parent_tools: ToolRegistry,
}

impl SubAgentManager {
    /// Create a manager that filters sub-agent tool subsets out of
    /// `parent_tools`.
    #[must_use]
    pub fn new(parent_tools: ToolRegistry) -> Self {
        Self { configs: HashMap::new(), parent_tools }
    }

    /// Register a sub-agent under `name`.
    pub fn register(&mut self, name: impl Into<String>, config: SubAgentConfig) {
        self.configs.insert(name.into(), config);
    }

    /// Look up a registered sub-agent's config.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SubAgentConfig> {
        self.configs.get(name)
    }

    /// Spawn a registered sub-agent and run it to completion.
    ///
    /// `current_depth` is the nesting depth of the caller; it is compared
    /// against the sub-agent's own `max_depth` before spawning.
    pub async fn spawn<M: Model>(
        &self,
        name: &str,
        current_depth: usize,
        model: &M,
        input: RunInput,
        tasks: &TaskStore,
        tool_ctx: &ToolContext,
    ) -> Result<RunResult, SubAgentError> {
        let config = self.configs.get(name).ok_or_else(|| SubAgentError::NotFound(name.to_string()))?;
        if current_depth >= config.max_depth {
            return Err(SubAgentError::MaxDepthExceeded(config.max_depth));
        }

        let tools = self.parent_tools.filtered(&config.tool_names);
        let mut agent = Agent::new(name).with_instructions(config.instructions.clone()).with_tools(tools);
        if let Some(model_override) = &config.model_override {
            agent = agent.with_model(model_override.clone());
        }

        let mut registry = AgentRegistry::new();
        registry.register(agent);

        let result = agent_loop::engine::run(&registry, name, model, input, &RunConfig::default(), config.max_turns, tasks, &[], tool_ctx).await?;
        Ok(result)
    }

    /// Spawn several sub-agents concurrently, each against its own input.
    ///
    /// Since this manager's loop is generic only over `M: Model`, genuine
    /// concurrency via `join_all` is available without an owned-task
    /// workaround for per-call generic type parameters.
    pub async fn spawn_parallel<M: Model>(
        &self,
        requests: Vec<(&str, usize, &M, RunInput)>,
        tasks: &TaskStore,
        tool_ctx: &ToolContext,
    ) -> Vec<Result<RunResult, SubAgentError>> {
        let futures = requests.into_iter().map(|(name, depth, model, input)| self.spawn(name, depth, model, input, tasks, tool_ctx));
        futures::future::join_all(futures).await
    }
}
