//! Azure DevOps capabilities
//!
//! Every capability in this module shares one [`DevOpsClient`]. Connection
//! details are pipeline variables (`System.AccessToken`,
//! `System.CollectionUri`, `System.TeamProject`) resolved through the run's
//! [`VariableStore`], so the agent's environment (`SYSTEM_ACCESSTOKEN`, ...)
//! is used unless the run has set the variable itself.
//!
//! Failures never escape as errors: each capability maps a [`DevOpsError`]
//! into a failed [`sdk::ToolResult`] so the replanner sees the reason.

pub mod build;
pub mod git;
pub mod notification;
pub mod timeline;

pub use build::{
    CheckArtifactExistsTool, GetBuildChangesTool, GetBuildInfoTool, GetBuildWorkItemsTool,
    GetTestResultsTool,
};
pub use git::{
    GetBranchPolicyTool, GetCommitInfoTool, GetPullRequestInfoTool, GetRepositoryInfoTool,
};
pub use notification::SendNotificationTool;
pub use timeline::GetPipelineTimelineTool;

use regex::Regex;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::VariableStore;
use crate::llm::http_client;

/// REST version pinned on endpoints that require one
pub const API_VERSION: &str = "7.0";

static REPOSITORY_GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}")
        .expect("valid repository id regex")
});

/// Why an Azure DevOps call could not produce a payload
#[derive(Debug, Error)]
pub enum DevOpsError {
    #[error("System.AccessToken not available. Ensure the task has access to the OAuth token.")]
    MissingToken,

    #[error("Required Azure DevOps variables not available")]
    MissingConnection,

    #[error("{0} not available")]
    MissingVariable(String),

    #[error("Azure DevOps API request failed: {status} - {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("Azure DevOps API request failed: {0}")]
    Transport(String),

    #[error("Invalid Azure DevOps response: {0}")]
    Parse(String),
}

/// Authenticated REST client for the current collection and project
#[derive(Debug, Clone)]
pub struct DevOpsClient {
    http: reqwest::Client,
    variables: Arc<VariableStore>,
}

impl DevOpsClient {
    pub fn new(variables: Arc<VariableStore>, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            variables,
        }
    }

    /// Pipeline variable lookup (run store, then environment)
    pub fn variable(&self, name: &str) -> Option<String> {
        self.variables.get(name)
    }

    /// Like [`Self::variable`] but absence is an error
    pub fn require(&self, name: &str) -> Result<String, DevOpsError> {
        self.variable(name)
            .ok_or_else(|| DevOpsError::MissingVariable(name.to_string()))
    }

    /// `Build.Repository.ID`, reduced to its GUID when the agent exposes a URL
    pub fn repository_id(&self) -> Option<String> {
        self.variable("Build.Repository.ID")
            .map(|raw| extract_repository_id(&raw))
    }

    /// `{collection}{project}/_apis{endpoint}`
    pub fn api_url(&self, endpoint: &str) -> Result<String, DevOpsError> {
        let collection = self.variable("System.CollectionUri");
        let project = self.variable("System.TeamProject");

        match (collection, project) {
            (Some(collection), Some(project)) => Ok(format!(
                "{}/{}/_apis{}",
                collection.trim_end_matches('/'),
                project,
                endpoint
            )),
            _ => Err(DevOpsError::MissingConnection),
        }
    }

    /// GET an endpoint under `_apis` and decode the JSON body
    pub async fn get(&self, endpoint: &str) -> Result<Value, DevOpsError> {
        let token = self
            .variable("System.AccessToken")
            .ok_or(DevOpsError::MissingToken)?;
        let url = self.api_url(endpoint)?;

        debug!("Azure DevOps GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| DevOpsError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DevOpsError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DevOpsError::Parse(e.to_string()))
    }
}

/// Pull the repository GUID out of an id or URL; other values pass through
pub fn extract_repository_id(raw: &str) -> String {
    REPOSITORY_GUID
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Copy selected fields out of an API payload.
///
/// Each pair is `(output key, JSON pointer)`; missing fields become `null`.
pub(crate) fn select(source: &Value, fields: &[(&str, &str)]) -> Value {
    let selected: Map<String, Value> = fields
        .iter()
        .map(|(key, pointer)| {
            (
                key.to_string(),
                source.pointer(pointer).cloned().unwrap_or(Value::Null),
            )
        })
        .collect();
    Value::Object(selected)
}

/// `value` array of a list response, empty when absent
pub(crate) fn list_values(payload: &Value) -> Vec<Value> {
    payload
        .get("value")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// `count` of a list response, zero when absent
pub(crate) fn list_count(payload: &Value) -> u64 {
    payload.get("count").and_then(Value::as_u64).unwrap_or(0)
}
