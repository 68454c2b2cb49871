//! Tool registry: register, describe, and invoke tools by name.

use std::collections::HashMap;
use std::sync::Arc;

use agent_types::{Tool, ToolContext, ToolDefinition, ToolDyn, ToolOutput};

/// Registry of tools, keyed by name.
///
/// Tools are stored as type-erased [`ToolDyn`] trait objects so tools with
/// different `Args`/`Output`/`Error` shapes can share one registry — the
/// generic-to-erased boundary is crossed exactly once, at [`ToolRegistry::register`].
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strongly-typed tool. Re-registering the same name
    /// silently replaces the previous tool, matching a `HashMap::insert`.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.tools.insert(T::NAME.to_string(), Arc::new(tool));
        self
    }

    /// Register an already type-erased tool (for example one filtered out
    /// of another registry for a sub-agent's restricted tool list).
    pub fn register_dyn(&mut self, tool: Arc<dyn ToolDyn>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDyn>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// The names of every registered tool.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Build a JSON-Schema function descriptor for every registered tool,
    /// for inclusion in a `ModelRequest`.
    #[must_use]
    pub fn describe(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Build a filtered registry containing only `names` that exist in
    /// `self`, used to carve out a restricted tool set for a sub-agent.
    #[must_use]
    pub fn filtered(&self, names: &[String]) -> ToolRegistry {
        let mut out = ToolRegistry::new();
        for name in names {
            if let Some(tool) = self.get(name) {
                out.register_dyn(tool);
            }
        }
        out
    }

    /// Invoke a tool by name against a raw parameter map.
    ///
    /// An unknown tool name or a parameter-coercion failure is
    /// **not** propagated as an error from this function — both surface as
    /// an `is_error` [`ToolOutput`] the model can see and recover from on
    /// the next turn. The only way this call "fails" in the Rust sense
    /// would be a panic inside the executor, which is not caught here.
    #[tracing::instrument(skip(self, input, ctx), fields(tool = %name))]
    pub async fn invoke(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> ToolOutput {
        match self.tools.get(name) {
            Some(tool) => match tool.invoke(input, ctx).await {
                Ok(output) => output,
                Err(err) => {
                    tracing::warn!(error = %err, "tool dispatch failed");
                    ToolOutput::error(err)
                }
            },
            None => {
                tracing::warn!("tool not found");
                ToolOutput::error(format!("tool not found: {name}"))
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
