use agent_types::{ToolContext, ToolDefinition, ToolOutput};

#[test]
fn tool_output_error_gets_prefixed() {
    let out = ToolOutput::error("boom");
    assert!(out.is_error);
    assert_eq!(out.content, "Error: boom");
}

#[test]
fn tool_output_ok_is_not_an_error() {
    let out = ToolOutput::ok("42");
    assert!(!out.is_error);
    assert_eq!(out.content, "42");
}

#[test]
fn tool_context_round_trips_typed_values() {
    let ctx = ToolContext::new().with_value("request_id", 7_u64);
    assert_eq!(ctx.get::<u64>("request_id"), Some(&7));
    assert_eq!(ctx.get::<u64>("missing"), None);
}

#[test]
fn tool_definition_serializes_as_a_function_descriptor() {
    let def = ToolDefinition {
        name: "get_time".to_string(),
        description: "Returns the current time".to_string(),
        parameters: serde_json::json!({ "type": "object", "properties": {} }),
    };
    let value = serde_json::to_value(&def).unwrap();
    assert_eq!(value["name"], "get_time");
}
