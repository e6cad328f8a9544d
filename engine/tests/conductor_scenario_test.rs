//! End-to-end conductor runs
//!
//! The decision scenario is served by a mock Ollama endpoint so the full
//! provider -> planner -> executor -> replanner path is exercised over HTTP.

mod common;

use common::{DelayedTool, RoleProvider, ScriptedProvider};
use serde_json::{json, Value};
use std::sync::Arc;
use waypoint_engine::conductor::executor::CapabilityInvocation;
use waypoint_engine::conductor::replanner::NO_ESSENTIAL_STEPS_RESPONSE;
use waypoint_engine::conductor::{
    Conductor, ContextBuilder, ExecutionState, Executor, PastStep, Phase, RunResult, TaskMode,
    STEP_LIMIT_RESPONSE,
};
use waypoint_engine::llm::ollama::OllamaProvider;
use waypoint_engine::tools::{SetPipelineVariableTool, ToolRegistry, VariableStore};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "llama3.1:8b",
        "created_at": "2024-01-01T00:00:00Z",
        "message": {"role": "assistant", "content": content},
        "done": true
    }))
}

async fn mount(server: &MockServer, markers: &[&str], content: &str) {
    let mut mock = Mock::given(method("POST")).and(path("/api/chat"));
    for marker in markers {
        mock = mock.and(body_string_contains(*marker));
    }
    mock.respond_with(ollama_reply(content))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_decision_scenario_over_ollama() {
    let server = MockServer::start().await;

    mount(
        &server,
        &["step by step plan"],
        r#"{"steps":["inspect test results","record decision"]}"#,
    )
    .await;
    mount(
        &server,
        &["execution agent", "Current step: inspect test results"],
        r#"{"type":"reasoning","result":"All 42 tests passed on main"}"#,
    )
    .await;
    mount(
        &server,
        &["replanning agent", "Pending - No decision variable set yet"],
        r#"{"action":{"steps":["record decision"]}}"#,
    )
    .await;
    mount(
        &server,
        &["execution agent", "Current step: record decision"],
        "```json\n{\"type\":\"tools\",\"tools\":[{\"tool\":\"set_pipeline_variable\",\"input\":\"build_status=green\"}]}\n```",
    )
    .await;
    mount(
        &server,
        &["replanning agent", "ACHIEVED - Variable/decision set"],
        r#"{"response":"Build marked green"}"#,
    )
    .await;

    let store = Arc::new(VariableStore::new(false));
    let tools = ToolRegistry::new(vec![Arc::new(SetPipelineVariableTool::new(Arc::clone(
        &store,
    )))])
    .unwrap();
    let llm = Arc::new(OllamaProvider::new(server.uri(), "llama3.1:8b"));
    let conductor = Conductor::new(llm, Arc::new(tools));

    let result = conductor
        .execute("set build status to green", "decision", Value::Null)
        .await;

    assert_eq!(result, RunResult::completed(Some("Build marked green".into())));
    assert_eq!(store.get("build_status").as_deref(), Some("green"));
}

#[tokio::test]
async fn test_provider_outage_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&server)
        .await;

    let llm = Arc::new(OllamaProvider::new(server.uri(), "llama3.1:8b"));
    let conductor = Conductor::new(llm, Arc::new(ToolRegistry::empty()));

    let result = conductor.execute("objective", "execution", Value::Null).await;
    assert!(!result.success);
    assert!(result.response.is_none());
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_ceiling_terminates_run() {
    let llm = Arc::new(RoleProvider {
        planner: r#"{"steps":["do something vague but >10 chars"]}"#.into(),
        executor: r#"{"type":"reasoning","result":"thinking"}"#.into(),
        replanner: r#"{"action":{"steps":["do something vague but >10 chars"]}}"#.into(),
    });
    let conductor = Conductor::new(llm, Arc::new(ToolRegistry::empty()));

    let mut state =
        ExecutionState::new("objective", ContextBuilder::new(TaskMode::Execution).build());
    conductor.drive(&mut state).await.unwrap();

    assert_eq!(state.past_steps.len(), 11);
    assert_eq!(state.response.as_deref(), Some(STEP_LIMIT_RESPONSE));
}

#[tokio::test]
async fn test_unparseable_oracle_still_terminates() {
    let llm = ScriptedProvider::new(&["I'm not sure what you mean."]);
    let conductor = Conductor::new(llm.clone(), Arc::new(ToolRegistry::empty()));

    let result = conductor.execute("objective", "decision", Value::Null).await;

    assert!(result.success);
    // plan fallback, one executor tick, one replanner tick
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_unknown_tool_does_not_abort_run() {
    let llm = ScriptedProvider::new(&[
        r#"{"steps":["call the missing tool"]}"#,
        r#"{"type":"tools","tools":[{"tool":"nonexistent","input":"x"}]}"#,
        r#"{"response":"done anyway"}"#,
    ]);
    let conductor = Conductor::new(llm, Arc::new(ToolRegistry::empty()));

    let mut state =
        ExecutionState::new("objective", ContextBuilder::new(TaskMode::Decision).build());
    conductor.drive(&mut state).await.unwrap();

    assert_eq!(
        state.past_steps,
        vec![PastStep::new("call the missing tool", "Unknown tool: nonexistent")]
    );
    assert_eq!(state.response.as_deref(), Some("done anyway"));
}

#[tokio::test]
async fn test_outcomes_keep_request_order() {
    let tools = ToolRegistry::new(vec![
        DelayedTool::new("slow", 300),
        DelayedTool::new("medium", 200),
        DelayedTool::new("fast", 100),
    ])
    .unwrap();
    let executor = Executor::new(ScriptedProvider::new(&[]), Arc::new(tools));

    let invocations: Vec<CapabilityInvocation> = ["slow", "medium", "fast"]
        .iter()
        .map(|name| CapabilityInvocation {
            name: name.to_string(),
            input: format!("from {}", name),
        })
        .collect();

    let started = std::time::Instant::now();
    let joined = executor.invoke_all(&invocations).await;

    assert_eq!(
        joined,
        "slow: \"from slow\"\nmedium: \"from medium\"\nfast: \"from fast\""
    );
    // concurrent dispatch: bounded by the slowest call, not the sum
    assert!(started.elapsed() < std::time::Duration::from_millis(550));
}

#[tokio::test]
async fn test_only_filler_steps_complete_run() {
    let llm = ScriptedProvider::new(&[
        r#"{"steps":["gather the build logs"]}"#,
        r#"{"type":"reasoning","result":"logs look clean"}"#,
        r#"{"action":{"steps":["continue","proceed","abc"]}}"#,
    ]);
    let conductor = Conductor::new(llm.clone(), Arc::new(ToolRegistry::empty()));

    let result = conductor.execute("objective", "decision", Value::Null).await;

    assert_eq!(
        result,
        RunResult::completed(Some(NO_ESSENTIAL_STEPS_RESPONSE.into()))
    );
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_history_is_append_only_and_terminal_is_final() {
    let llm = ScriptedProvider::new(&[
        r#"{"steps":["first essential step","second essential step"]}"#,
        r#"{"type":"reasoning","result":"first done"}"#,
        r#"{"action":{"steps":["second essential step","third essential step"]}}"#,
        r#"{"type":"reasoning","result":"second done"}"#,
        r#"{"response":"all done"}"#,
    ]);
    let conductor = Conductor::new(llm.clone(), Arc::new(ToolRegistry::empty()));

    let mut state =
        ExecutionState::new("objective", ContextBuilder::new(TaskMode::Decision).build());
    let mut phase = Phase::Planning;
    let mut seen: Vec<PastStep> = Vec::new();

    while phase != Phase::Terminal {
        phase = conductor.advance(&mut state, phase).await.unwrap();

        assert!(state.past_steps.len() >= seen.len());
        assert_eq!(&state.past_steps[..seen.len()], seen.as_slice());
        seen = state.past_steps.clone();
    }

    assert_eq!(state.response.as_deref(), Some("all done"));
    assert_eq!(state.plan, vec!["third essential step".to_string()]);

    let calls = llm.call_count();
    for phase in [Phase::Planning, Phase::Executing, Phase::Replanning] {
        assert_eq!(
            conductor.advance(&mut state, phase).await.unwrap(),
            Phase::Terminal
        );
    }
    assert_eq!(state.past_steps, seen);
    assert_eq!(state.plan, vec!["third essential step".to_string()]);
    assert_eq!(llm.call_count(), calls);
}

#[tokio::test]
async fn test_context_overlay_reaches_planner() {
    let llm = ScriptedProvider::new(&[r#"{"steps":[]}"#, r#"{"response":"ok"}"#]);
    let conductor = Conductor::new(llm.clone(), Arc::new(ToolRegistry::empty()));

    let result = conductor
        .execute(
            "objective",
            "execution",
            Value::String(r#"{"branch":"main","mode":"decision"}"#.into()),
        )
        .await;
    assert_eq!(result, RunResult::completed(Some("ok".into())));

    let planner_input = &llm.calls()[0][1].content;
    assert!(planner_input.contains("\"branch\": \"main\""));
    assert!(planner_input.contains("\"mode\": \"execution\""));
}
