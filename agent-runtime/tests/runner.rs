use std::sync::Arc;

use agent_loop::{Agent, AgentRegistry};
use agent_runtime::{RunOptions, Runner};
use agent_types::{ModelRequest, ModelResponse, ProviderError, RunInput, StreamEvent};
use tokio::sync::Mutex;

struct ScriptedModel {
    responses: Mutex<std::collections::VecDeque<ModelResponse>>,
}

impl ScriptedModel {
    fn new(responses: Vec<ModelResponse>) -> Self {
        Self { responses: Mutex::new(responses.into()) }
    }
}

impl agent_types::Model for ScriptedModel {
    async fn get_response(&self, _request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        self.responses.lock().await.pop_front().ok_or_else(|| ProviderError::Provider("script exhausted".to_string()))
    }

    async fn stream_response(&self, _request: ModelRequest) -> Result<tokio::sync::mpsc::Receiver<StreamEvent>, ProviderError> {
        unimplemented!("not exercised by these tests")
    }
}

fn plain_content(content: &str) -> ModelResponse {
    ModelResponse { content: Some(content.to_string()), tool_calls: Vec::new(), handoff: None, usage: None }
}

fn registry_with_one_agent() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry.register(Agent::new("orchestrator").with_instructions("answer questions"));
    registry
}

#[tokio::test]
async fn runner_drives_a_plain_run_to_completion() {
    let runner = Runner::new(registry_with_one_agent());
    let model = ScriptedModel::new(vec![plain_content("Hi there")]);
    let options = RunOptions::default();

    let result = runner.run("orchestrator", &model, RunInput::from("hello"), &options).await.unwrap();

    assert_eq!(result.final_output.as_deref(), Some("Hi there"));
}

#[tokio::test]
async fn a_cancelled_run_is_reported_as_cancelled() {
    let runner = Runner::new(registry_with_one_agent());
    let model = ScriptedModel::new(vec![]);
    let mut options = RunOptions::default();
    options.cancel.cancel();

    let err = runner.run("orchestrator", &model, RunInput::from("hello"), &options).await.unwrap_err();

    assert!(matches!(err, agent_runtime::RunError::Cancelled));
}

#[tokio::test]
async fn run_step_advances_one_turn_at_a_time() {
    let runner = Runner::new(registry_with_one_agent());
    let model = ScriptedModel::new(vec![plain_content("Final")]);
    let options = RunOptions::default();
    let hooks: Vec<Arc<dyn agent_types::Hooks>> = Vec::new();

    let mut steps = runner.run_step("orchestrator", &model, RunInput::from("hi"), &options, &hooks);

    let first = steps.next().await.unwrap();
    assert!(matches!(first, agent_loop::StepResult::Done));
    assert_eq!(steps.result().final_output.as_deref(), Some("Final"));
}

#[tokio::test]
async fn sub_agent_manager_spawns_a_registered_sub_agent() {
    use agent_tasks::TaskStore;
    use agent_tool::ToolRegistry;
    use agent_types::ToolContext;

    let manager = agent_runtime::SubAgentManager::new(ToolRegistry::new());
    let mut manager = manager;
    manager.register("Summarizer", agent_runtime::SubAgentConfig::new("summarize the input").with_max_depth(2));

    let model = ScriptedModel::new(vec![plain_content("summary: ok")]);
    let tasks = TaskStore::new();
    let tool_ctx = ToolContext::new();

    let result = manager.spawn("Summarizer", 0, &model, RunInput::from("long text"), &tasks, &tool_ctx).await.unwrap();

    assert_eq!(result.final_output.as_deref(), Some("summary: ok"));
}

#[tokio::test]
async fn sub_agent_manager_rejects_exceeding_max_depth() {
    use agent_tasks::TaskStore;
    use agent_tool::ToolRegistry;
    use agent_types::ToolContext;

    let mut manager = agent_runtime::SubAgentManager::new(ToolRegistry::new());
    manager.register("Summarizer", agent_runtime::SubAgentConfig::new("summarize").with_max_depth(1));

    let model = ScriptedModel::new(vec![]);
    let tasks = TaskStore::new();
    let tool_ctx = ToolContext::new();

    let err = manager.spawn("Summarizer", 1, &model, RunInput::from("x"), &tasks, &tool_ctx).await.unwrap_err();

    assert!(matches!(err, agent_runtime::SubAgentError::MaxDepthExceeded(1)));
}
