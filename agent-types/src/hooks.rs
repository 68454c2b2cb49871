//! Lifecycle hook interface.
//!
//! A run fires these at well-known points so callers can observe or veto
//! progress (logging, budget enforcement, approval gates) without the
//! engine itself knowing about any of that. Every method defaults to a
//! no-op so implementors only override the points they care about.
//! Returning `Err` from any hook aborts the run — see [`HookError`].

use serde_json::Value;

use crate::error::HookError;
use crate::request::ModelRequest;
use crate::response::ModelResponse;
use crate::run_item::RunResult;
use crate::tool::ToolOutput;

/// Lifecycle hooks, fired by a run (run-wide) or by an individual agent
/// (agent-level).
#[async_trait::async_trait]
pub trait Hooks: Send + Sync {
    /// Fired once, before the first turn of a run.
    async fn on_run_start(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired at the start of every turn, before the request is assembled.
    async fn on_turn_start(&self, turn: usize, agent: &str) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired after a turn's response has been classified and acted on.
    async fn on_turn_end(&self, turn: usize, agent: &str, response: &ModelResponse) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired once, after the run reaches a terminal state.
    async fn on_run_end(&self, result: &RunResult) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired just before a handoff transition is applied.
    async fn on_before_handoff(&self, from_agent: &str, to_agent: &str) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired just after a handoff transition has been applied.
    async fn on_after_handoff(&self, from_agent: &str, to_agent: &str) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired when an agent becomes the current agent.
    async fn on_agent_start(&self, agent: &str) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired when an agent stops being the current agent (handoff or run end).
    async fn on_agent_end(&self, agent: &str) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired immediately before `Model::get_response`/`stream_response`.
    async fn on_before_model_call(&self, agent: &str, request: &ModelRequest) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired immediately after a model call returns.
    async fn on_after_model_call(&self, agent: &str, response: &ModelResponse) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired immediately before a tool is invoked.
    async fn on_before_tool_call(&self, agent: &str, tool: &str, parameters: &Value) -> Result<(), HookError> {
        Ok(())
    }

    /// Fired immediately after a tool invocation returns.
    async fn on_after_tool_call(&self, agent: &str, tool: &str, output: &ToolOutput) -> Result<(), HookError> {
        Ok(())
    }
}
