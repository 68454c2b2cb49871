//! Builds one `ModelRequest` per turn from the current agent, the pending
//! input, and the run's settings layer.

use agent_types::{ModelRequest, ModelSettings, RunConfig, RunInput, ToolChoice, ToolDefinition};
use serde_json::json;

use crate::agent::Agent;

/// Build the request for the next turn.
///
/// `consecutive_tool_calls` is the running counter from the turn loop; once
/// it reaches 3 the assembler forces `tool_choice = auto` as a nudge against
/// runaway tool-call chains, on top of both settings layers.
#[must_use]
pub fn assemble_request(
    agent: &Agent,
    input: RunInput,
    run_config: &RunConfig,
    consecutive_tool_calls: usize,
    task_tracking: bool,
) -> ModelRequest {
    let mut settings = ModelSettings::merge(&agent.model_settings, &run_config.settings);
    if consecutive_tool_calls >= 3 {
        settings.tool_choice = Some(ToolChoice::Auto);
    }

    let mut tools = agent.tools.describe();
    tools.extend(agent.handoffs.iter().map(|target| handoff_descriptor(target, task_tracking)));

    ModelRequest {
        system_instructions: Some(agent.instructions.clone()),
        input,
        tools,
        output_schema: agent.output_schema.clone(),
        settings,
    }
}

/// Build the synthetic `handoff_to_<AgentName>` function descriptor for one
/// handoff target.
fn handoff_descriptor(target: &str, task_tracking: bool) -> ToolDefinition {
    let mut properties = json!({
        "input": { "type": "string" },
    });
    if task_tracking {
        let props = properties.as_object_mut().expect("object literal");
        props.insert("task_id".to_string(), json!({ "type": "string" }));
        props.insert("return_to_agent".to_string(), json!({ "type": "string" }));
        props.insert("is_task_complete".to_string(), json!({ "type": "boolean" }));
    }

    ToolDefinition {
        name: format!("handoff_to_{target}"),
        description: format!("Transfer control to the {target} agent"),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": ["input"],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_descriptors_are_disjoint_from_tool_descriptors() {
        let agent = Agent::new("orchestrator")
            .with_instructions("route work")
            .with_handoffs(["analyzer"]);
        let request = assemble_request(&agent, RunInput::from("hi"), &RunConfig::default(), 0, false);

        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.tools[0].name, "handoff_to_analyzer");
    }

    #[test]
    fn three_consecutive_tool_calls_force_auto_tool_choice() {
        let agent = Agent::new("worker").with_instructions("work");
        let request = assemble_request(&agent, RunInput::from("hi"), &RunConfig::default(), 3, false);
        assert_eq!(request.settings.tool_choice, Some(ToolChoice::Auto));
    }

    #[test]
    fn run_config_settings_win_over_agent_settings() {
        let agent = Agent::new("worker").with_model_settings(ModelSettings {
            temperature: Some(0.2),
            ..Default::default()
        });
        let run_config = RunConfig {
            settings: ModelSettings {
                temperature: Some(0.9),
                ..Default::default()
            },
            ..Default::default()
        };
        let request = assemble_request(&agent, RunInput::from("hi"), &run_config, 0, false);
        assert_eq!(request.settings.temperature, Some(0.9));
    }
}
