//! Build capabilities: changes, details, tests, artifacts, work items

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use super::{list_count, list_values, select, DevOpsClient, DevOpsError, API_VERSION};

/// Files touched by the commits that make up the current build
#[derive(Debug, Clone)]
pub struct GetBuildChangesTool {
    client: Arc<DevOpsClient>,
}

impl GetBuildChangesTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn changes(&self) -> Result<Value, DevOpsError> {
        let build_id = self.client.require("Build.BuildId")?;
        let changes = self
            .client
            .get(&format!(
                "/build/builds/{}/changes?api-version={}",
                build_id, API_VERSION
            ))
            .await?;

        let commits = list_values(&changes);
        info!("Build {} has {} commits with changes", build_id, commits.len());

        let mut changed_files: Vec<String> = Vec::new();
        if !commits.is_empty() {
            match self.client.repository_id() {
                Some(repository) => {
                    for commit in commits.iter().filter_map(|c| c.get("id")?.as_str()) {
                        match self.commit_files(&repository, commit).await {
                            Ok(files) => {
                                for file in files {
                                    if !changed_files.contains(&file) {
                                        changed_files.push(file);
                                    }
                                }
                            }
                            Err(e) => warn!("Failed to get changes for commit {}: {}", commit, e),
                        }
                    }
                }
                None => warn!("Build.Repository.ID not available, cannot list changed files"),
            }
        }

        info!("{} unique files changed", changed_files.len());

        Ok(json!({
            "buildId": build_id,
            "sourceVersion": self.client.variable("Build.SourceVersion"),
            "sourceBranch": self.client.variable("Build.SourceBranch"),
            "totalChangedFiles": changed_files.len(),
            "changedFiles": changed_files,
        }))
    }

    async fn commit_files(&self, repository: &str, commit: &str) -> Result<Vec<String>, DevOpsError> {
        let changes = self
            .client
            .get(&format!(
                "/git/repositories/{}/commits/{}/changes?api-version={}",
                repository, commit, API_VERSION
            ))
            .await?;

        Ok(changes
            .get("changes")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|c| c.pointer("/item/path").or_else(|| c.get("path")))
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl Capability for GetBuildChangesTool {
    fn name(&self) -> &str {
        "get_build_changes"
    }

    fn description(&self) -> &str {
        "Get the list of files changed in the current build"
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        match self.changes().await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}

/// Status, timing and provenance of the current build
#[derive(Debug, Clone)]
pub struct GetBuildInfoTool {
    client: Arc<DevOpsClient>,
}

impl GetBuildInfoTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn info(&self) -> Result<Value, DevOpsError> {
        let build_id = self.client.require("Build.BuildId")?;
        let build = self
            .client
            .get(&format!("/build/builds/{}?api-version={}", build_id, API_VERSION))
            .await?;

        Ok(select(
            &build,
            &[
                ("buildId", "/id"),
                ("buildNumber", "/buildNumber"),
                ("status", "/status"),
                ("result", "/result"),
                ("queueTime", "/queueTime"),
                ("startTime", "/startTime"),
                ("finishTime", "/finishTime"),
                ("reason", "/reason"),
                ("requestedFor", "/requestedFor"),
                ("definition", "/definition"),
                ("repository", "/repository"),
                ("sourceBranch", "/sourceBranch"),
                ("sourceVersion", "/sourceVersion"),
            ],
        ))
    }
}

#[async_trait]
impl Capability for GetBuildInfoTool {
    fn name(&self) -> &str {
        "get_build_info"
    }

    fn description(&self) -> &str {
        "Get detailed information about the current build"
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        match self.info().await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}

/// Test run totals for the current build
#[derive(Debug, Clone)]
pub struct GetTestResultsTool {
    client: Arc<DevOpsClient>,
}

impl GetTestResultsTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn results(&self) -> Result<Value, DevOpsError> {
        let build_id = self.client.require("Build.BuildId")?;
        let results = self
            .client
            .get(&format!("/build/builds/{}/testresults", build_id))
            .await?;

        let tally = |key: &str| results.get(key).and_then(Value::as_u64).unwrap_or(0);

        Ok(json!({
            "totalTests": list_count(&results),
            "passedTests": tally("passedTests"),
            "failedTests": tally("failedTests"),
            "skippedTests": tally("skippedTests"),
            "testRuns": list_values(&results),
        }))
    }
}

#[async_trait]
impl Capability for GetTestResultsTool {
    fn name(&self) -> &str {
        "get_test_results"
    }

    fn description(&self) -> &str {
        "Get test results for the current build"
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        match self.results().await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}

/// Look up a published artifact of the current build by exact name
#[derive(Debug, Clone)]
pub struct CheckArtifactExistsTool {
    client: Arc<DevOpsClient>,
}

impl CheckArtifactExistsTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn check(&self, artifact_name: &str) -> Result<Value, DevOpsError> {
        let build_id = self.client.require("Build.BuildId")?;
        let artifacts = list_values(
            &self
                .client
                .get(&format!("/build/builds/{}/artifacts", build_id))
                .await?,
        );

        let found = artifacts
            .iter()
            .find(|a| a.get("name").and_then(Value::as_str) == Some(artifact_name))
            .cloned();
        let names: Vec<Value> = artifacts
            .iter()
            .filter_map(|a| a.get("name").cloned())
            .collect();

        Ok(json!({
            "exists": found.is_some(),
            "artifact": found,
            "allArtifacts": names,
        }))
    }
}

#[async_trait]
impl Capability for CheckArtifactExistsTool {
    fn name(&self) -> &str {
        "check_artifact_exists"
    }

    fn description(&self) -> &str {
        "Check if a specific artifact exists in the current build"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let artifact_name = input.trim();
        if artifact_name.is_empty() {
            return ToolResult::failure(self.name(), "Artifact name is required");
        }

        match self.check(artifact_name).await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}

/// Work items linked to the current build
#[derive(Debug, Clone)]
pub struct GetBuildWorkItemsTool {
    client: Arc<DevOpsClient>,
}

impl GetBuildWorkItemsTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn work_items(&self) -> Result<Value, DevOpsError> {
        let build_id = self.client.require("Build.BuildId")?;
        let work_items = self
            .client
            .get(&format!("/build/builds/{}/workitems", build_id))
            .await?;

        Ok(json!({
            "count": list_count(&work_items),
            "workItems": list_values(&work_items),
        }))
    }
}

#[async_trait]
impl Capability for GetBuildWorkItemsTool {
    fn name(&self) -> &str {
        "get_build_work_items"
    }

    fn description(&self) -> &str {
        "Get work items associated with the current build"
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        match self.work_items().await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}
