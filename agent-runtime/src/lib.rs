//! Runner wiring, lifecycle hooks, and workflow/state management: the
//! ambient layer around the turn loop, tying an [`agent_loop::AgentRegistry`]
//! together with hooks, retries, checkpointed state, and sub-agent spawning.

pub mod error;
pub mod hooks;
pub mod runner;
pub mod state;
pub mod sub_agent;
pub mod workflow;

pub use error::{PanicError, RunError, StateError, SubAgentError};
pub use hooks::HookRegistry;
pub use runner::{RunOptions, Runner};
pub use state::{FileStateStore, InMemoryStateStore, StateStore, WorkflowState};
pub use sub_agent::{SubAgentConfig, SubAgentManager};
pub use workflow::{RetryConfig, WorkflowConfig, WorkflowError, run_with_recovery};
