use std::sync::Arc;

use agent_loop::{Agent, AgentRegistry};
use agent_tasks::TaskStore;
use agent_tool::ToolRegistry;
use agent_types::{
    HandoffCall, HandoffKind, ModelRequest, ModelResponse, ProviderError, RunConfig, RunInput, RunItem, StreamEvent,
    Tool, ToolChoice, ToolContext,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;

/// A `Model` that plays back a scripted sequence of responses, recording
/// every request it was asked to serve.
struct ScriptedModel {
    responses: Mutex<std::collections::VecDeque<ModelResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl agent_types::Model for ScriptedModel {
    async fn get_response(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ProviderError::Provider("script exhausted".to_string()))
    }

    async fn stream_response(
        &self,
        _request: ModelRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<StreamEvent>, ProviderError> {
        unimplemented!("not exercised by these scenarios")
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EmptyArgs {}

struct GetTime;

impl Tool for GetTime {
    const NAME: &'static str = "get_time";
    type Args = EmptyArgs;
    type Output = String;
    type Error = std::convert::Infallible;

    async fn call(&self, _args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        Ok("2025-01-01T00:00:00Z".to_string())
    }
}

struct BoomTool;

impl Tool for BoomTool {
    const NAME: &'static str = "boom_tool";
    type Args = EmptyArgs;
    type Output = String;
    type Error = String;

    async fn call(&self, _args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        Err("boom".to_string())
    }
}

fn plain_content(content: &str) -> ModelResponse {
    ModelResponse {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
        handoff: None,
        usage: None,
    }
}

fn empty_response() -> ModelResponse {
    ModelResponse {
        content: None,
        tool_calls: Vec::new(),
        handoff: None,
        usage: None,
    }
}

fn single_tool_call(name: &str) -> ModelResponse {
    ModelResponse {
        content: None,
        tool_calls: vec![agent_types::ToolCall {
            name: name.to_string(),
            id: None,
            parameters: serde_json::json!({}),
        }],
        handoff: None,
        usage: None,
    }
}

#[tokio::test]
async fn plain_answer() {
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("orchestrator").with_instructions("answer questions"));

    let model = ScriptedModel::new(vec![plain_content("Hi there")]);
    let tasks = TaskStore::new();
    let result = agent_loop::engine::run(
        &registry,
        "orchestrator",
        &model,
        RunInput::from("Hello"),
        &RunConfig::default(),
        10,
        &tasks,
        &[],
        &ToolContext::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.final_output.as_deref(), Some("Hi there"));
    assert_eq!(result.new_items.len(), 0);
    assert_eq!(result.raw_responses.len(), 1);
    assert_eq!(result.last_agent, "orchestrator");
}

#[tokio::test]
async fn single_tool_call_then_answer() {
    let mut tools = ToolRegistry::new();
    tools.register(GetTime);
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("orchestrator").with_instructions("answer questions").with_tools(tools));

    let model = ScriptedModel::new(vec![
        single_tool_call("get_time"),
        plain_content("The time is 2025-01-01T00:00:00Z"),
    ]);
    let tasks = TaskStore::new();
    let result = agent_loop::engine::run(
        &registry,
        "orchestrator",
        &model,
        RunInput::from("what time is it?"),
        &RunConfig::default(),
        10,
        &tasks,
        &[],
        &ToolContext::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.new_items.len(), 2);
    assert!(matches!(&result.new_items[0], RunItem::ToolCall { name, .. } if name == "get_time"));
    assert!(matches!(&result.new_items[1], RunItem::ToolResult { name, result } if name == "get_time" && result == "2025-01-01T00:00:00Z"));
    assert_eq!(result.final_output.as_deref(), Some("The time is 2025-01-01T00:00:00Z"));
    assert_eq!(result.raw_responses.len(), 2);
}

#[tokio::test]
async fn delegation_and_return() {
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("orchestrator").with_instructions("route work").with_handoffs(["Analyzer"]));
    registry.register(Agent::new("Analyzer").with_instructions("analyze").with_handoffs(["return_to_delegator"]));

    let model = ScriptedModel::new(vec![
        ModelResponse {
            content: None,
            tool_calls: Vec::new(),
            handoff: Some(HandoffCall {
                agent: "Analyzer".to_string(),
                parameters: serde_json::json!({"input": "analyze X"}),
                task_id: None,
                return_to_agent: None,
                is_task_complete: false,
                kind: HandoffKind::Delegate,
            }),
            usage: None,
        },
        ModelResponse {
            content: None,
            tool_calls: Vec::new(),
            handoff: Some(HandoffCall {
                agent: "return_to_delegator".to_string(),
                parameters: serde_json::json!({"input": "issues: Y", "is_task_complete": true}),
                task_id: None,
                return_to_agent: None,
                is_task_complete: true,
                kind: HandoffKind::Return,
            }),
            usage: None,
        },
        plain_content("Done: Y"),
    ]);

    let tasks = TaskStore::new();
    let result = agent_loop::engine::run(
        &registry,
        "orchestrator",
        &model,
        RunInput::from("please analyze X"),
        &RunConfig::default(),
        10,
        &tasks,
        &[],
        &ToolContext::new(),
    )
    .await
    .unwrap();

    let handoffs: Vec<_> = result
        .new_items
        .iter()
        .filter(|i| matches!(i, RunItem::Handoff { .. }))
        .collect();
    assert_eq!(handoffs.len(), 2);
    assert_eq!(result.last_agent, "orchestrator");
    assert_eq!(result.final_output.as_deref(), Some("Done: Y"));

    let analyzer_task = tasks.get_task_for_agent("Analyzer").await.unwrap();
    assert_eq!(analyzer_task.status, agent_tasks::TaskStatus::Complete);
    assert_eq!(analyzer_task.result.as_deref(), Some("issues: Y"));
}

#[tokio::test]
async fn three_consecutive_tool_calls_trigger_nudge() {
    let mut tools = ToolRegistry::new();
    tools.register(GetTime);
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("worker").with_instructions("work").with_tools(tools));

    let model = Arc::new(ScriptedModel::new(vec![
        single_tool_call("get_time"),
        single_tool_call("get_time"),
        single_tool_call("get_time"),
        plain_content("All done"),
    ]));
    let tasks = TaskStore::new();
    let result = agent_loop::engine::run(
        &registry,
        "worker",
        model.as_ref(),
        RunInput::from("keep checking the time"),
        &RunConfig::default(),
        10,
        &tasks,
        &[],
        &ToolContext::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.final_output.as_deref(), Some("All done"));

    let requests = model.requests.lock().await;
    assert_eq!(requests.len(), 4);
    let fourth = &requests[3];
    assert_eq!(fourth.settings.tool_choice, Some(ToolChoice::Auto));
    let nudged = fourth
        .input
        .clone()
        .into_items()
        .iter()
        .any(|item| {
            item.get("content")
                .and_then(|c| c.as_str())
                .map(|c| c.contains("please provide a complete response to my original question."))
                .unwrap_or(false)
        });
    assert!(nudged, "expected the fourth request to carry the nudge message");
}

#[tokio::test]
async fn unknown_handoff_is_fatal() {
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("orchestrator").with_instructions("route work"));

    let model = ScriptedModel::new(vec![ModelResponse {
        content: None,
        tool_calls: Vec::new(),
        handoff: Some(HandoffCall {
            agent: "Ghost".to_string(),
            parameters: serde_json::json!({"input": "go"}),
            task_id: None,
            return_to_agent: None,
            is_task_complete: false,
            kind: HandoffKind::Delegate,
        }),
        usage: None,
    }]);
    let tasks = TaskStore::new();
    let err = agent_loop::engine::run(
        &registry,
        "orchestrator",
        &model,
        RunInput::from("do something"),
        &RunConfig::default(),
        10,
        &tasks,
        &[],
        &ToolContext::new(),
    )
    .await
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("handoff agent"));
    assert!(message.contains("Ghost"));
}

#[tokio::test]
async fn empty_response_is_a_no_op_continue() {
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("orchestrator").with_instructions("answer questions"));

    let model = ScriptedModel::new(vec![empty_response(), plain_content("finally, an answer")]);
    let tasks = TaskStore::new();
    let result = agent_loop::engine::run(
        &registry,
        "orchestrator",
        &model,
        RunInput::from("Hello"),
        &RunConfig::default(),
        10,
        &tasks,
        &[],
        &ToolContext::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.raw_responses.len(), 2, "the empty turn must be a no-op, not a terminal state");
    assert_eq!(result.final_output.as_deref(), Some("finally, an answer"));
}

#[tokio::test]
async fn max_turns_one_with_a_tool_call_exhausts_without_crashing() {
    let mut tools = ToolRegistry::new();
    tools.register(GetTime);
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("worker").with_instructions("work").with_tools(tools));

    let model = ScriptedModel::new(vec![single_tool_call("get_time")]);
    let tasks = TaskStore::new();
    let result = agent_loop::engine::run(
        &registry,
        "worker",
        &model,
        RunInput::from("what time is it?"),
        &RunConfig::default(),
        1,
        &tasks,
        &[],
        &ToolContext::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.final_output, None, "a tool-call-only last turn has no text content to report");
    assert_eq!(result.raw_responses.len(), 1);
    assert_eq!(result.last_agent, "worker");
}

#[tokio::test]
async fn tool_failure_is_recovered() {
    let mut tools = ToolRegistry::new();
    tools.register(BoomTool);
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("worker").with_instructions("work").with_tools(tools));

    let model = ScriptedModel::new(vec![single_tool_call("boom_tool"), plain_content("recovered")]);
    let tasks = TaskStore::new();
    let result = agent_loop::engine::run(
        &registry,
        "worker",
        &model,
        RunInput::from("try the tool"),
        &RunConfig::default(),
        10,
        &tasks,
        &[],
        &ToolContext::new(),
    )
    .await
    .unwrap();

    assert!(matches!(&result.new_items[1], RunItem::ToolResult { result, .. } if result == "Error: boom"));
    assert_eq!(result.final_output.as_deref(), Some("recovered"));
}
