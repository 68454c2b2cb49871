use agent_tasks::{TaskStatus, TaskStore};

#[tokio::test]
async fn delegator_stack_resolves_return_to_delegator() {
    let store = TaskStore::new();
    store.register_delegation("planner", "coder").await;

    assert_eq!(store.get_delegator("coder").await, Some("planner".to_string()));
    store.complete_delegation("planner", "coder").await;
    assert_eq!(store.get_delegator("coder").await, None);
}

#[tokio::test]
async fn nested_delegations_unwind_in_lifo_order() {
    let store = TaskStore::new();
    store.register_delegation("planner", "coder").await;
    store.register_delegation("reviewer", "coder").await;

    assert_eq!(store.get_delegator("coder").await, Some("reviewer".to_string()));
    store.complete_delegation("reviewer", "coder").await;
    assert_eq!(store.get_delegator("coder").await, Some("planner".to_string()));
    store.complete_delegation("planner", "coder").await;
    assert_eq!(store.get_delegator("coder").await, None);
}

#[tokio::test]
async fn a_task_cannot_be_completed_twice() {
    let store = TaskStore::new();
    let id = store.create_task("planner", "coder", "write a function").await;

    store.complete_task(&id, "done").await.unwrap();
    let err = store.complete_task(&id, "done again").await.unwrap_err();
    assert!(matches!(err, agent_tasks::TaskError::AlreadyTerminal(_, "complete")));

    let task = store.get(&id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Complete);
    assert_eq!(task.result.as_deref(), Some("done"));
}

#[tokio::test]
async fn completing_and_failing_are_mutually_exclusive() {
    let store = TaskStore::new();
    let id = store.create_task("planner", "coder", "write a function").await;

    store.fail_task(&id, "compile error").await.unwrap();
    let err = store.complete_task(&id, "done").await.unwrap_err();
    assert!(matches!(err, agent_tasks::TaskError::AlreadyTerminal(_, "failed")));
}

#[tokio::test]
async fn related_tasks_copy_context_forward_and_stay_acyclic() {
    let store = TaskStore::new();
    let root = store.create_task("planner", "coder", "implement the parser").await;
    store
        .update_task_context(&root, Some("fn parse() {}".to_string()), Some("code".to_string()))
        .await
        .unwrap();

    let child = store
        .create_related_task(&root, "coder", "reviewer", "review the parser")
        .await
        .unwrap();

    let child_task = store.get(&child).await.unwrap();
    assert_eq!(child_task.context.artifact.as_deref(), Some("fn parse() {}"));
    assert!(child_task.related_task_ids.contains(&root));

    let root_task = store.get(&root).await.unwrap();
    assert!(root_task.related_task_ids.contains(&child));
    // Acyclic: the child never appears as its own ancestor.
    assert!(!child_task.related_task_ids.contains(&child));
}

#[tokio::test]
async fn get_task_for_agent_returns_the_most_recent_task() {
    let store = TaskStore::new();
    let first = store.create_task("planner", "coder", "task one").await;
    let second = store.create_task("planner", "coder", "task two").await;

    let current = store.get_task_for_agent("coder").await.unwrap();
    assert_eq!(current.id, second);
    assert_ne!(current.id, first);
}

#[tokio::test]
async fn get_parent_task_finds_the_delegators_own_task() {
    let store = TaskStore::new();
    let parent_task = store.create_task("planner", "coder", "implement it").await;
    let child_task = store
        .create_related_task(&parent_task, "coder", "reviewer", "review it")
        .await
        .unwrap();

    let resolved = store.get_parent_task(&child_task).await.unwrap();
    assert_eq!(resolved.id, parent_task);
}

#[tokio::test]
async fn metadata_and_interactions_accumulate_on_a_task() {
    let store = TaskStore::new();
    let id = store.create_task("planner", "coder", "implement it").await;

    store
        .add_task_metadata(&id, "language", serde_json::json!("rust"))
        .await
        .unwrap();
    store.add_task_interaction(&id, "child", "working on it").await.unwrap();
    store.add_task_interaction(&id, "child", "done").await.unwrap();

    let task = store.get(&id).await.unwrap();
    assert_eq!(task.context.metadata["language"], "rust");
    assert_eq!(task.interactions.len(), 2);
}

#[tokio::test]
async fn operations_on_an_unknown_task_id_are_not_found() {
    let store = TaskStore::new();
    let err = store.complete_task("ghost", "result").await.unwrap_err();
    assert!(matches!(err, agent_tasks::TaskError::NotFound(id) if id == "ghost"));
}
