#![deny(missing_docs)]
//! Umbrella crate: a single import surface over the agent execution engine.
//!
//! Re-exports the tool, task, loop, and runtime crates plus a `prelude` for
//! the common happy path of building an [`agent_loop::Agent`], registering
//! it, and driving it with a [`agent_runtime::Runner`].

pub use agent_loop;
pub use agent_runtime;
pub use agent_tasks;
pub use agent_tool;
pub use agent_types;

/// Happy-path imports for composing and running agents.
pub mod prelude {
    pub use agent_loop::{Agent, AgentRegistry, StepIterator, StepResult};
    pub use agent_runtime::{HookRegistry, RunOptions, Runner, SubAgentConfig, SubAgentManager};
    pub use agent_tasks::{Task, TaskStatus, TaskStore};
    pub use agent_tool::{Tool, ToolRegistry};
    pub use agent_types::{
        HandoffCall, HandoffKind, Hooks, Model, ModelRequest, ModelResponse, RunConfig, RunInput, RunItem, RunResult,
        StreamEvent, ToolContext, ToolOutput,
    };
}
