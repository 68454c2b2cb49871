//! `Agent`: a named configuration bundle, and the registry that resolves
//! handoff targets by name at dispatch time rather than following a
//! (possibly cyclic) graph of `Arc<Agent>` references at construction.

use std::collections::HashMap;
use std::sync::Arc;

use agent_tool::ToolRegistry;
use agent_types::{Hooks, ModelSettings};
use serde_json::Value;

/// A named role in a conversation: its own instructions, tools, and the
/// peers it may hand off to.
///
/// Immutable with respect to a run — a [`crate::Runner`]-equivalent caller
/// builds the agent graph once and shares it read-only across runs; any
/// per-run mutable settings are copies, never patches to the agent itself.
pub struct Agent {
    /// Unique name among peers addressable in one run.
    pub name: String,
    /// System instructions for this agent.
    pub instructions: String,
    /// A short human-readable description (used by some providers/tools,
    /// never interpreted by the engine itself).
    pub description: Option<String>,
    /// A model reference (name or handle) — purely informational; the
    /// engine itself never selects a concrete provider.
    pub model: Option<String>,
    /// Per-agent settings overrides, filled in under the run-wide layer's
    /// override order.
    pub model_settings: ModelSettings,
    /// The agent's callable tools.
    pub tools: ToolRegistry,
    /// Names of agents (or the `return_to_delegator` sentinel) this agent
    /// may hand off to.
    pub handoffs: Vec<String>,
    /// JSON-Schema for structured output, if this agent declares one.
    pub output_schema: Option<Value>,
    /// Agent-level lifecycle hooks, fired in addition to run-wide hooks.
    pub hooks: Vec<Arc<dyn Hooks>>,
}

impl Agent {
    /// Start building an agent with just a name; everything else defaults
    /// to empty/unset.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: String::new(),
            description: None,
            model: None,
            model_settings: ModelSettings::default(),
            tools: ToolRegistry::new(),
            handoffs: Vec::new(),
            output_schema: None,
            hooks: Vec::new(),
        }
    }

    /// Set the system instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Set a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the model reference.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Replace the agent's model settings overrides.
    #[must_use]
    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Replace the agent's tool registry.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Add peer agent names (or the `return_to_delegator` sentinel) this
    /// agent may hand off to.
    #[must_use]
    pub fn with_handoffs<I: IntoIterator<Item = S>, S: Into<String>>(mut self, handoffs: I) -> Self {
        self.handoffs.extend(handoffs.into_iter().map(Into::into));
        self
    }

    /// Declare a structured-output schema.
    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Attach an agent-level lifecycle hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn Hooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Whether `agent` appears in this agent's handoff list, by name.
    #[must_use]
    pub fn can_hand_off_to(&self, agent: &str) -> bool {
        self.handoffs.iter().any(|h| h == agent)
    }
}

/// Resolves handoff targets by name at dispatch time.
///
/// Agent handoff graphs may be cyclic (A hands off to B, B hands off back
/// to A); the registry never follows references recursively, it only ever
/// does a single name lookup per handoff.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<Agent>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under its own name.
    pub fn register(&mut self, agent: Agent) -> &mut Self {
        self.agents.insert(agent.name.clone(), Arc::new(agent));
        self
    }

    /// Look up an agent by name. Never returns an entry for the reserved
    /// `return_to_delegator` sentinel, which is not an agent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.get(name).cloned()
    }

    /// Every registered agent's name.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }
}
