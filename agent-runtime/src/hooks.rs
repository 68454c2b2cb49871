//! Composing multiple lifecycle hook implementations into one pipeline.
//!
//! An ordered list of hook implementations dispatched in registration
//! order. Any hook error propagates immediately and aborts the pipeline —
//! the engine's contract is that any hook error aborts the run, so a
//! registry that swallowed errors would silently violate that for every
//! consumer that composes hooks through it.

use std::sync::Arc;

use agent_types::hooks::Hooks;
use agent_types::{HookError, ModelRequest, ModelResponse, RunResult};

/// An ordered pipeline of [`Hooks`] implementations, itself a [`Hooks`]
/// implementation.
///
/// Register loggers, metrics collectors, and guardrails independently and
/// hand a single `Arc<HookRegistry>` to the runner wherever one `Arc<dyn
/// Hooks>` is expected.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn Hooks>>,
}

impl HookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook to the end of the pipeline.
    pub fn add(&mut self, hook: Arc<dyn Hooks>) {
        self.hooks.push(hook);
    }
}

#[async_trait::async_trait]
impl Hooks for HookRegistry {
    async fn on_run_start(&self) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_run_start().await?;
        }
        Ok(())
    }

    async fn on_turn_start(&self, turn: usize, agent: &str) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_turn_start(turn, agent).await?;
        }
        Ok(())
    }

    async fn on_turn_end(&self, turn: usize, agent: &str, response: &ModelResponse) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_turn_end(turn, agent, response).await?;
        }
        Ok(())
    }

    async fn on_run_end(&self, result: &RunResult) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_run_end(result).await?;
        }
        Ok(())
    }

    async fn on_before_handoff(&self, from: &str, to: &str) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_before_handoff(from, to).await?;
        }
        Ok(())
    }

    async fn on_after_handoff(&self, from: &str, to: &str) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_after_handoff(from, to).await?;
        }
        Ok(())
    }

    async fn on_agent_start(&self, agent: &str) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_agent_start(agent).await?;
        }
        Ok(())
    }

    async fn on_agent_end(&self, agent: &str) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_agent_end(agent).await?;
        }
        Ok(())
    }

    async fn on_before_model_call(&self, agent: &str, request: &ModelRequest) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_before_model_call(agent, request).await?;
        }
        Ok(())
    }

    async fn on_after_model_call(&self, agent: &str, response: &ModelResponse) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_after_model_call(agent, response).await?;
        }
        Ok(())
    }

    async fn on_before_tool_call(&self, agent: &str, tool: &str, parameters: &serde_json::Value) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_before_tool_call(agent, tool, parameters).await?;
        }
        Ok(())
    }

    async fn on_after_tool_call(&self, agent: &str, tool: &str, output: &agent_types::ToolOutput) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_after_tool_call(agent, tool, output).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Hooks for CountingHook {
        async fn on_run_start(&self) -> Result<(), HookError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHook;

    #[async_trait::async_trait]
    impl Hooks for FailingHook {
        async fn on_run_start(&self) -> Result<(), HookError> {
            Err(HookError::new("on_run_start", "nope"))
        }
    }

    #[tokio::test]
    async fn dispatches_to_every_registered_hook_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = HookRegistry::new();
        registry.add(Arc::new(CountingHook(counter.clone())));
        registry.add(Arc::new(CountingHook(counter.clone())));

        registry.on_run_start().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn a_failing_hook_aborts_the_pipeline() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = HookRegistry::new();
        registry.add(Arc::new(FailingHook));
        registry.add(Arc::new(CountingHook(counter.clone())));

        let err = registry.on_run_start().await.unwrap_err();
        assert_eq!(err.point, "on_run_start");
        assert_eq!(counter.load(Ordering::SeqCst), 0, "hook after the failing one must not run");
    }
}
