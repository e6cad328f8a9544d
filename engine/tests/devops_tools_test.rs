//! Integration tests for the Azure DevOps capabilities
//!
//! A wiremock server stands in for the collection. Connection and build
//! variables are set on the run's variable store, which is consulted before
//! the agent environment.

use sdk::Capability;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use waypoint_engine::tools::{
    CheckArtifactExistsTool, DevOpsClient, GetBranchPolicyTool, GetBuildChangesTool,
    GetBuildInfoTool, GetBuildWorkItemsTool, GetCommitInfoTool, GetPipelineTimelineTool,
    GetPullRequestInfoTool, GetRepositoryInfoTool, GetTestResultsTool, VariableStore,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "0d8b6c1e-3f4a-4b5c-9d6e-7f8091a2b3c4";
const API: &str = "/contoso/Fabrikam/_apis";

fn store_for(server: &MockServer, extra: &[(&str, &str)]) -> Arc<VariableStore> {
    let store = Arc::new(VariableStore::new(false));
    store.set("System.AccessToken", "pipeline-token");
    store.set("System.CollectionUri", &format!("{}/contoso/", server.uri()));
    store.set("System.TeamProject", "Fabrikam");
    store.set("Build.BuildId", "42");
    store.set("Build.SourceVersion", "a1b2c3d");
    store.set("Build.SourceBranch", "refs/heads/main");
    store.set(
        "Build.Repository.ID",
        &format!("https://dev.azure.com/contoso/_apis/git/repositories/{}", REPO),
    );
    for (name, value) in extra {
        store.set(name, value);
    }
    store
}

fn client_for(server: &MockServer) -> Arc<DevOpsClient> {
    Arc::new(DevOpsClient::new(
        store_for(server, &[]),
        Duration::from_secs(5),
    ))
}

async fn serve(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{}{}", API, route)))
        .and(header("Authorization", "Bearer pipeline-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_build_info_selects_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/build/builds/42", API)))
        .and(query_param("api-version", "7.0"))
        .and(header("Authorization", "Bearer pipeline-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "buildNumber": "20240101.3",
            "status": "inProgress",
            "result": null,
            "reason": "individualCI",
            "sourceBranch": "refs/heads/main",
            "sourceVersion": "a1b2c3d",
            "definition": {"id": 7, "name": "ci"},
            "_links": {"web": {"href": "https://example"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = GetBuildInfoTool::new(client_for(&server)).execute("").await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.result["buildId"], 42);
    assert_eq!(result.result["buildNumber"], "20240101.3");
    assert_eq!(result.result["definition"]["name"], "ci");
    assert_eq!(result.result["finishTime"], Value::Null);
    assert!(result.result.get("_links").is_none());
}

#[tokio::test]
async fn test_build_changes_collects_unique_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/build/builds/42/changes", API)))
        .and(query_param("api-version", "7.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "value": [{"id": "c1"}, {"id": "c2"}, {"id": "c3"}]
        })))
        .mount(&server)
        .await;
    serve(
        &server,
        &format!("/git/repositories/{}/commits/c1/changes", REPO),
        json!({"changes": [
            {"item": {"path": "/src/main.rs"}},
            {"item": {"path": "/Cargo.toml"}}
        ]}),
    )
    .await;
    serve(
        &server,
        &format!("/git/repositories/{}/commits/c2/changes", REPO),
        json!({"changes": [
            {"item": {"path": "/src/main.rs"}},
            {"path": "/README.md"}
        ]}),
    )
    .await;
    // one commit failing does not fail the capability
    Mock::given(method("GET"))
        .and(path(format!("{}/git/repositories/{}/commits/c3/changes", API, REPO)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = GetBuildChangesTool::new(client_for(&server)).execute("").await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        result.result["changedFiles"],
        json!(["/src/main.rs", "/Cargo.toml", "/README.md"])
    );
    assert_eq!(result.result["totalChangedFiles"], 3);
    assert_eq!(result.result["buildId"], "42");
    assert_eq!(result.result["sourceBranch"], "refs/heads/main");
}

#[tokio::test]
async fn test_test_results_default_missing_tallies() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/build/builds/42/testresults",
        json!({"count": 12, "passedTests": 11, "failedTests": 1, "value": [{"id": 1}]}),
    )
    .await;

    let result = GetTestResultsTool::new(client_for(&server)).execute("").await;

    assert!(result.success);
    assert_eq!(
        result.result,
        json!({
            "totalTests": 12,
            "passedTests": 11,
            "failedTests": 1,
            "skippedTests": 0,
            "testRuns": [{"id": 1}]
        })
    );
}

#[tokio::test]
async fn test_artifact_lookup_is_exact() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/build/builds/42/artifacts",
        json!({"count": 2, "value": [
            {"name": "drop", "resource": {"type": "Container"}},
            {"name": "drop-symbols"}
        ]}),
    )
    .await;
    let tool = CheckArtifactExistsTool::new(client_for(&server));

    let present = tool.execute(" drop \n").await;
    assert!(present.success);
    assert_eq!(present.result["exists"], true);
    assert_eq!(present.result["artifact"]["resource"]["type"], "Container");
    assert_eq!(present.result["allArtifacts"], json!(["drop", "drop-symbols"]));

    let absent = tool.execute("Drop").await;
    assert_eq!(absent.result["exists"], false);
    assert_eq!(absent.result["artifact"], Value::Null);

    assert!(!tool.execute("  ").await.success);
}

#[tokio::test]
async fn test_work_items_and_timeline() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/build/builds/42/workitems",
        json!({"count": 1, "value": [{"id": "311", "url": "https://example/311"}]}),
    )
    .await;
    serve(
        &server,
        "/build/builds/42/timeline",
        json!({
            "records": [{"type": "Stage", "name": "Build", "result": "succeeded"}],
            "lastChangedBy": "00000002-0000-8888-8000-000000000000",
            "lastChangedOn": "2024-01-01T00:00:00Z"
        }),
    )
    .await;
    let client = client_for(&server);

    let work_items = GetBuildWorkItemsTool::new(Arc::clone(&client)).execute("").await;
    assert_eq!(work_items.result["count"], 1);
    assert_eq!(work_items.result["workItems"][0]["id"], "311");

    let timeline = GetPipelineTimelineTool::new(client).execute("").await;
    assert!(timeline.success);
    assert_eq!(timeline.result["records"][0]["name"], "Build");
    assert_eq!(timeline.result["lastChangedOn"], "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_commit_info_uses_input_then_source_version() {
    let server = MockServer::start().await;
    serve(
        &server,
        &format!("/git/repositories/{}/commits/feedbee", REPO),
        json!({"commitId": "feedbee", "comment": "Fix flaky test", "author": {"name": "Ada"}}),
    )
    .await;
    serve(
        &server,
        &format!("/git/repositories/{}/commits/a1b2c3d", REPO),
        json!({"commitId": "a1b2c3d", "comment": "Bump version"}),
    )
    .await;
    let tool = GetCommitInfoTool::new(client_for(&server));

    let explicit = tool.execute("feedbee").await;
    assert_eq!(explicit.result["comment"], "Fix flaky test");
    assert_eq!(explicit.result["author"]["name"], "Ada");

    let current = tool.execute("").await;
    assert_eq!(current.result["commitId"], "a1b2c3d");
    assert_eq!(current.result["changeCounts"], Value::Null);
}

#[tokio::test]
async fn test_pull_request_info() {
    let server = MockServer::start().await;
    serve(
        &server,
        &format!("/git/repositories/{}/pullrequests/77", REPO),
        json!({
            "pullRequestId": 77,
            "title": "Add caching",
            "status": "active",
            "sourceRefName": "refs/heads/feature/cache",
            "targetRefName": "refs/heads/main",
            "mergeStatus": "succeeded"
        }),
    )
    .await;

    let store = store_for(&server, &[("System.PullRequest.PullRequestId", "77")]);
    let client = Arc::new(DevOpsClient::new(store, Duration::from_secs(5)));
    let result = GetPullRequestInfoTool::new(client).execute("").await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.result["isPullRequest"], true);
    assert_eq!(result.result["title"], "Add caching");
    assert_eq!(result.result["targetRefName"], "refs/heads/main");
}

#[tokio::test]
async fn test_non_pull_request_build_succeeds_without_calls() {
    if std::env::var("SYSTEM_PULLREQUEST_PULLREQUESTID").is_ok() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let result = GetPullRequestInfoTool::new(client_for(&server)).execute("").await;

    assert!(result.success);
    assert_eq!(result.result["isPullRequest"], false);
    assert_eq!(
        result.result["message"],
        "This build is not triggered by a pull request"
    );
}

#[tokio::test]
async fn test_repository_and_branch_policy() {
    let server = MockServer::start().await;
    serve(
        &server,
        &format!("/git/repositories/{}", REPO),
        json!({"id": REPO, "name": "waypoint", "defaultBranch": "refs/heads/main", "size": 2048}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/policy/configurations", API)))
        .and(query_param("repositoryId", REPO))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "value": [{"id": 5, "type": {"displayName": "Minimum number of reviewers"}}]
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let repository = GetRepositoryInfoTool::new(Arc::clone(&client)).execute("").await;
    assert_eq!(repository.result["name"], "waypoint");
    assert_eq!(repository.result["size"], 2048);

    let policy = GetBranchPolicyTool::new(client).execute("").await;
    assert!(policy.success);
    assert_eq!(policy.result["count"], 1);
    assert_eq!(policy.result["branch"], "refs/heads/main");
}

#[tokio::test]
async fn test_http_error_becomes_failed_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = GetBuildInfoTool::new(client_for(&server)).execute("").await;

    assert!(!result.success);
    assert_eq!(result.result, Value::Null);
    assert_eq!(
        result.error.as_deref(),
        Some("Azure DevOps API request failed: 404 - /build/builds/42?api-version=7.0")
    );
    assert!(result.summary().starts_with("get_build_info: Azure DevOps API request failed"));
}

#[tokio::test]
async fn test_missing_connection_fails_without_request() {
    if std::env::var("SYSTEM_COLLECTIONURI").is_ok() {
        return;
    }
    let store = Arc::new(VariableStore::new(false));
    store.set("System.AccessToken", "pipeline-token");
    store.set("Build.BuildId", "42");
    let client = Arc::new(DevOpsClient::new(store, Duration::from_secs(5)));

    let result = GetTestResultsTool::new(client).execute("").await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Required Azure DevOps variables not available")
    );
}
