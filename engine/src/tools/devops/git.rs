//! Git capabilities: commit, pull request, repository, branch policy

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{list_count, list_values, select, DevOpsClient, DevOpsError, API_VERSION};

fn require_repository(client: &DevOpsClient) -> Result<String, DevOpsError> {
    client
        .repository_id()
        .ok_or_else(|| DevOpsError::MissingVariable("Build.Repository.ID".to_string()))
}

/// Author, message and change counts of a commit (default: the built one)
#[derive(Debug, Clone)]
pub struct GetCommitInfoTool {
    client: Arc<DevOpsClient>,
}

impl GetCommitInfoTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn commit(&self, commit_id: Option<&str>) -> Result<Value, DevOpsError> {
        let commit = commit_id
            .map(str::to_string)
            .or_else(|| self.client.variable("Build.SourceVersion"));
        let (Some(commit), Some(repository)) = (commit, self.client.repository_id()) else {
            return Err(DevOpsError::MissingVariable(
                "Build.SourceVersion or Build.Repository.ID".to_string(),
            ));
        };

        let info = self
            .client
            .get(&format!(
                "/git/repositories/{}/commits/{}?api-version={}",
                repository, commit, API_VERSION
            ))
            .await?;

        Ok(select(
            &info,
            &[
                ("commitId", "/commitId"),
                ("author", "/author"),
                ("committer", "/committer"),
                ("comment", "/comment"),
                ("changeCounts", "/changeCounts"),
                ("url", "/url"),
            ],
        ))
    }
}

#[async_trait]
impl Capability for GetCommitInfoTool {
    fn name(&self) -> &str {
        "get_commit_info"
    }

    fn description(&self) -> &str {
        "Get detailed information about the current commit"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let commit_id = Some(input.trim()).filter(|c| !c.is_empty());

        match self.commit(commit_id).await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}

/// Pull request details when the build was triggered by one
#[derive(Debug, Clone)]
pub struct GetPullRequestInfoTool {
    client: Arc<DevOpsClient>,
}

impl GetPullRequestInfoTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn pull_request(&self) -> Result<Value, DevOpsError> {
        let Some(pr_id) = self.client.variable("System.PullRequest.PullRequestId") else {
            info!("Build is not a pull request build");
            return Ok(json!({
                "isPullRequest": false,
                "message": "This build is not triggered by a pull request",
            }));
        };

        let repository = require_repository(&self.client)?;
        let pr = self
            .client
            .get(&format!(
                "/git/repositories/{}/pullrequests/{}?api-version={}",
                repository, pr_id, API_VERSION
            ))
            .await?;

        let mut result = select(
            &pr,
            &[
                ("pullRequestId", "/pullRequestId"),
                ("title", "/title"),
                ("description", "/description"),
                ("status", "/status"),
                ("createdBy", "/createdBy"),
                ("sourceRefName", "/sourceRefName"),
                ("targetRefName", "/targetRefName"),
                ("mergeStatus", "/mergeStatus"),
            ],
        );
        if let Some(fields) = result.as_object_mut() {
            fields.insert("isPullRequest".to_string(), Value::Bool(true));
        }
        Ok(result)
    }
}

#[async_trait]
impl Capability for GetPullRequestInfoTool {
    fn name(&self) -> &str {
        "get_pull_request_info"
    }

    fn description(&self) -> &str {
        "Get pull request information if this build is triggered by a PR"
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        match self.pull_request().await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}

/// Name, default branch and size of the built repository
#[derive(Debug, Clone)]
pub struct GetRepositoryInfoTool {
    client: Arc<DevOpsClient>,
}

impl GetRepositoryInfoTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn repository(&self) -> Result<Value, DevOpsError> {
        let repository = require_repository(&self.client)?;
        let info = self
            .client
            .get(&format!("/git/repositories/{}", repository))
            .await?;

        Ok(select(
            &info,
            &[
                ("id", "/id"),
                ("name", "/name"),
                ("url", "/url"),
                ("defaultBranch", "/defaultBranch"),
                ("size", "/size"),
                ("project", "/project"),
            ],
        ))
    }
}

#[async_trait]
impl Capability for GetRepositoryInfoTool {
    fn name(&self) -> &str {
        "get_repository_info"
    }

    fn description(&self) -> &str {
        "Get repository information and statistics"
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        match self.repository().await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}

/// Policy configurations of the built repository
#[derive(Debug, Clone)]
pub struct GetBranchPolicyTool {
    client: Arc<DevOpsClient>,
}

impl GetBranchPolicyTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn policies(&self) -> Result<Value, DevOpsError> {
        let (Some(repository), Some(branch)) = (
            self.client.repository_id(),
            self.client.variable("Build.SourceBranch"),
        ) else {
            return Err(DevOpsError::MissingVariable(
                "Build.Repository.ID or Build.SourceBranch".to_string(),
            ));
        };

        let policies = self
            .client
            .get(&format!("/policy/configurations?repositoryId={}", repository))
            .await?;

        Ok(json!({
            "policies": list_values(&policies),
            "count": list_count(&policies),
            "branch": branch,
        }))
    }
}

#[async_trait]
impl Capability for GetBranchPolicyTool {
    fn name(&self) -> &str {
        "get_branch_policy"
    }

    fn description(&self) -> &str {
        "Get branch policies for the current branch"
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        match self.policies().await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}
