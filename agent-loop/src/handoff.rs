//! Handoff transitions: delegation to a named peer, or a
//! `return_to_delegator` back up the delegation chain.

use agent_tasks::TaskStore;
use agent_types::{HandoffCall, HandoffKind, RunInput};
use serde_json::{Value, json};

use crate::agent::{Agent, AgentRegistry};
use crate::error::LoopError;

/// The outcome of applying a handoff: the new current agent and the
/// (possibly enhanced) input it should see next.
pub struct HandoffTransition {
    /// The agent handed off to.
    pub agent: String,
    /// The enhanced input carried into the new agent.
    pub input: RunInput,
}

/// Apply a handoff call, mutating the task store as a side effect, and
/// return the new current agent and its input.
pub async fn apply_handoff(
    call: &HandoffCall,
    current_agent: &Agent,
    registry: &AgentRegistry,
    tasks: &TaskStore,
) -> Result<HandoffTransition, LoopError> {
    match call.kind {
        HandoffKind::Return => apply_return(call, current_agent, tasks).await,
        HandoffKind::Delegate => apply_delegate(call, current_agent, registry, tasks).await,
    }
}

async fn apply_return(
    call: &HandoffCall,
    current_agent: &Agent,
    tasks: &TaskStore,
) -> Result<HandoffTransition, LoopError> {
    if !current_agent.can_hand_off_to(HandoffCall::RETURN_TO_DELEGATOR) {
        return Err(LoopError::NoDelegator(current_agent.name.clone()));
    }
    let delegator = tasks
        .get_delegator(&current_agent.name)
        .await
        .ok_or_else(|| LoopError::NoDelegator(current_agent.name.clone()))?;

    let input_value = call.input();
    let input_text = value_as_text(&input_value);

    if let Some(current_task) = tasks.get_task_for_agent(&current_agent.name).await {
        if call.is_task_complete {
            let _ = tasks.complete_task(&current_task.id, input_text.clone()).await;
        }
        if let Some(parent_task) = tasks.get_parent_task(&current_task.id).await {
            let _ = tasks
                .add_task_metadata(
                    &parent_task.id,
                    format!("child_result_{}", current_task.id),
                    json!(input_text),
                )
                .await;

            let (artifact, artifact_type) = extract_artifact(&input_text, &input_value);
            let _ = tasks
                .update_task_context(&parent_task.id, Some(artifact), Some(artifact_type))
                .await;

            let enhanced = enhance_for_return(&input_value, &parent_task.id, &parent_task.description);
            tasks.complete_delegation(&delegator, &current_agent.name).await;
            return Ok(HandoffTransition {
                agent: delegator,
                input: json_to_run_input(enhanced),
            });
        }
    }

    tasks.complete_delegation(&delegator, &current_agent.name).await;
    Ok(HandoffTransition {
        agent: delegator,
        input: json_to_run_input(input_value),
    })
}

async fn apply_delegate(
    call: &HandoffCall,
    current_agent: &Agent,
    registry: &AgentRegistry,
    tasks: &TaskStore,
) -> Result<HandoffTransition, LoopError> {
    let target = call.agent.clone();
    if registry.get(&target).is_none() || !current_agent.can_hand_off_to(&target) {
        return Err(LoopError::HandoffAgentNotFound(target));
    }

    tasks.register_delegation(&current_agent.name, &target).await;

    let input_value = call.input();
    let input_text = value_as_text(&input_value);

    let current_task = tasks.get_task_for_agent(&current_agent.name).await;
    let new_task_id = match &current_task {
        // `t` was just read from the store, so the only failure mode of
        // `create_related_task` (an unknown parent id) cannot occur here.
        Some(t) => tasks
            .create_related_task(&t.id, &current_agent.name, &target, &input_text)
            .await
            .expect("parent task id was just read from the store"),
        None => tasks.create_task(&current_agent.name, &target, &input_text).await,
    };
    let _ = tasks.add_task_interaction(&new_task_id, "parent", input_text.clone()).await;

    let enhanced = match &current_task {
        Some(t) if t.context.artifact.is_some() => enhance_for_delegation(
            &input_value,
            t.context.artifact.as_deref(),
            t.context.artifact_type.as_deref().unwrap_or("text"),
        ),
        _ => input_value,
    };

    Ok(HandoffTransition {
        agent: target,
        input: json_to_run_input(enhanced),
    })
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_to_run_input(value: Value) -> RunInput {
    match value {
        Value::String(s) => RunInput::Text(s),
        other => RunInput::Text(other.to_string()),
    }
}

/// Heuristically classify the return value as a `code` or `text` artifact:
/// a map's `code`/`text` field wins verbatim; otherwise the text is
/// classified as code if it contains `function ` or `class `.
fn extract_artifact(input_text: &str, input_value: &Value) -> (String, String) {
    if let Value::Object(map) = input_value {
        if let Some(code) = map.get("code").and_then(Value::as_str) {
            return (code.to_string(), "code".to_string());
        }
        if let Some(text) = map.get("text").and_then(Value::as_str) {
            return (text.to_string(), "text".to_string());
        }
    }
    let artifact_type = if input_text.contains("function ") || input_text.contains("class ") {
        "code"
    } else {
        "text"
    };
    (input_text.to_string(), artifact_type.to_string())
}

fn enhance_for_return(input: &Value, task_id: &str, description: &str) -> Value {
    match input {
        Value::String(s) => Value::String(format!(
            "{s}\n\n[task {task_id}: {description}]"
        )),
        Value::Object(map) => {
            let mut map = map.clone();
            map.insert("task_id".to_string(), json!(task_id));
            map.insert("task_context".to_string(), json!({ "description": description }));
            Value::Object(map)
        }
        other => other.clone(),
    }
}

fn enhance_for_delegation(input: &Value, artifact: Option<&str>, artifact_type: &str) -> Value {
    let Some(artifact) = artifact else {
        return input.clone();
    };
    match input {
        Value::String(s) if artifact_type == "code" => {
            Value::String(format!("```\n{artifact}\n```\n\n{s}"))
        }
        Value::String(s) => Value::String(format!("{artifact}\n\n{s}")),
        Value::Object(map) => {
            let mut map = map.clone();
            let key = if artifact_type == "code" { "code_context" } else { "context" };
            map.insert(key.to_string(), json!(artifact));
            Value::Object(map)
        }
        other => other.clone(),
    }
}
