//! Model settings and their override/merge order.

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// How the model should decide whether to call a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides freely.
    Auto,
    /// The model must not call a tool this turn.
    None,
    /// The model must call some tool this turn.
    Required,
    /// The model must call this specific tool.
    Named(String),
}

/// Per-call overrides to the model invocation. Every field is optional:
/// `None` means "use whatever the next layer down specifies."
///
/// Three layers contribute a `ModelSettings`, merged via [`ModelSettings::merge`]
/// in this override order: run-wide `RunConfig` settings win for
/// fields they explicitly set, the agent's own settings fill in the rest, and
/// a turn-local override (the tool-choice nudge after three consecutive tool
/// calls) is applied last, on top of both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Tool-choice strategy for this call.
    pub tool_choice: Option<ToolChoice>,
    /// Whether the provider may execute multiple tool calls in one turn.
    pub parallel_tool_calls: Option<bool>,
    /// Provider-specific fields that don't have a first-class slot here.
    #[serde(default)]
    pub extra: Map<String, serde_json::Value>,
}

impl ModelSettings {
    /// Merge `override_settings` on top of `base`. A field in
    /// `override_settings` wins only when it is `Some`/non-empty; otherwise
    /// the value from `base` is kept.
    #[must_use]
    pub fn merge(base: &ModelSettings, override_settings: &ModelSettings) -> ModelSettings {
        let mut extra = base.extra.clone();
        extra.extend(override_settings.extra.clone());
        ModelSettings {
            temperature: override_settings.temperature.or(base.temperature),
            top_p: override_settings.top_p.or(base.top_p),
            max_tokens: override_settings.max_tokens.or(base.max_tokens),
            tool_choice: override_settings
                .tool_choice
                .clone()
                .or_else(|| base.tool_choice.clone()),
            parallel_tool_calls: override_settings
                .parallel_tool_calls
                .or(base.parallel_tool_calls),
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_only_for_fields_it_sets() {
        let base = ModelSettings {
            temperature: Some(0.2),
            top_p: Some(0.9),
            ..Default::default()
        };
        let over = ModelSettings {
            temperature: Some(0.7),
            ..Default::default()
        };
        let merged = ModelSettings::merge(&base, &over);
        assert_eq!(merged.temperature, Some(0.7));
        assert_eq!(merged.top_p, Some(0.9));
    }
}
