//! The `Tool` contract: definition, execution, and type erasure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ToolError;

/// Ambient data passed to every tool execution.
///
/// The engine never inspects the named values — they are opaque,
/// caller-provided context (a database handle, a working directory, a
/// request id) threaded through to tool executors. Cheap to clone: wrap
/// anything non-trivial in an `Arc`. The cancellation token is the one
/// field the engine itself reads: it checks it between tool dispatches so a
/// cancelled run stops issuing new tool calls.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Free-form values keyed by name. Tools downcast what they need.
    values: HashMap<String, Arc<dyn std::any::Any + Send + Sync>>,
    /// Cooperative cancellation, checked by the turn loop between tool
    /// dispatches. Defaults to a token that never fires.
    cancel: CancellationToken,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }
}

impl ToolContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a named value, returning the updated context.
    #[must_use]
    pub fn with_value<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.values.insert(key.into(), Arc::new(value));
        self
    }

    /// Look up a named value by its concrete type.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Replace the default, never-firing cancellation token with `cancel`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether the ambient cancellation token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A JSON-Schema function descriptor for a tool, as sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool's name, unique within an agent's tool list.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON-Schema object describing the accepted parameters.
    pub parameters: serde_json::Value,
}

/// The outcome of invoking a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The tool's result, already serialized to a string for the model.
    ///
    /// Executor errors are serialized here with an `Error: ` prefix rather
    /// than aborting the run.
    pub content: String,
    /// Whether `content` represents an error.
    pub is_error: bool,
}

impl ToolOutput {
    /// A successful output.
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// An error output, rendered with the conventional `Error: ` prefix.
    #[must_use]
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: format!("Error: {message}"),
            is_error: true,
        }
    }
}

/// A strongly-typed tool.
///
/// Implement this for each tool; register it with `agent_tool::ToolRegistry`.
/// The registry erases `Args`/`Output`/`Error` behind [`ToolDyn`] so tools
/// of different shapes can live in one registry.
pub trait Tool: Send + Sync {
    /// The tool's name. Must be unique within an agent's tool list.
    const NAME: &'static str;

    /// The typed parameter shape this tool accepts.
    ///
    /// Coercion from the model's untyped parameter map into this type is
    /// handled uniformly by `agent_tool::coerce` — tools never parse their
    /// own arguments.
    type Args: serde::de::DeserializeOwned + schemars::JsonSchema + Send;

    /// The typed success value. Must be displayable so it can be folded
    /// into the string-valued [`ToolOutput`] the model sees.
    type Output: std::fmt::Display + Send;

    /// The typed error value.
    type Error: std::fmt::Display + Send;

    /// A human-readable description shown to the model. Defaults to empty.
    fn description(&self) -> &str {
        ""
    }

    /// An explicit parameter schema overriding the inferred one. Most tools
    /// should leave this `None` and let the registry infer the schema from
    /// `Args` via `schemars`.
    fn explicit_schema(&self) -> Option<serde_json::Value> {
        None
    }

    /// Execute the tool against its typed, already-coerced arguments.
    fn call(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Type-erased tool, used by the registry so tools of different shapes can
/// be stored in one map.
///
/// Blanket-implemented for every [`Tool`] — executors never implement this
/// directly.
pub trait ToolDyn: Send + Sync {
    /// The tool's name.
    fn name(&self) -> &str;

    /// The tool's JSON-Schema function descriptor.
    fn definition(&self) -> ToolDefinition;

    /// Coerce `input` into the tool's typed arguments and execute it,
    /// returning a string-valued [`ToolOutput`].
    fn invoke<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> futures::future::BoxFuture<'a, Result<ToolOutput, ToolError>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        let schema = match self.explicit_schema() {
            Some(s) => s,
            None => serde_json::to_value(schemars::schema_for!(T::Args))
                .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        };
        ToolDefinition {
            name: T::NAME.to_string(),
            description: self.description().to_string(),
            parameters: schema,
        }
    }

    fn invoke<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> futures::future::BoxFuture<'a, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let args: T::Args = crate::coerce::coerce(input)
                .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;
            match self.call(args, ctx).await {
                Ok(output) => Ok(ToolOutput::ok(output.to_string())),
                Err(err) => Ok(ToolOutput::error(err)),
            }
        })
    }
}
