//! Capability registry and built-in capabilities
//!
//! The registry is a flat, immutable-after-construction table of
//! `Arc<dyn Capability>` keyed by exact name. It is shared read-only across
//! concurrent invocations during a run.

pub mod devops;
pub mod environment;
pub mod filesystem;
pub mod terminal;
pub mod variables;

pub use devops::{
    CheckArtifactExistsTool, DevOpsClient, DevOpsError, GetBranchPolicyTool, GetBuildChangesTool,
    GetBuildInfoTool, GetBuildWorkItemsTool, GetCommitInfoTool, GetPipelineTimelineTool,
    GetPullRequestInfoTool, GetRepositoryInfoTool, GetTestResultsTool, SendNotificationTool,
};
pub use environment::GetEnvironmentVariableTool;
pub use filesystem::{ListDirectoryTool, ReadFileTool, WriteFileTool};
pub use terminal::ExecuteCommandTool;
pub use variables::{GetPipelineVariableTool, SetPipelineVariableTool, VariableStore};

use sdk::errors::EngineError;
use sdk::Capability;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::ToolsConfig;

/// Registry of capabilities the executor may dispatch to.
///
/// Registration order is preserved and is the order capabilities are
/// rendered into prompts.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Capability>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry from a list of capabilities.
    ///
    /// Fails on the first duplicate name.
    pub fn new(tools: Vec<Arc<dyn Capability>>) -> Result<Self, EngineError> {
        let mut registry = Self::empty();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Build the built-in capability set enabled by `[tools]`.
    ///
    /// Every pipeline-aware capability shares one variable store, so a value
    /// set during the run is what the Azure DevOps capabilities read back.
    pub fn from_config(config: &ToolsConfig, workspace: &Path) -> Result<Self, EngineError> {
        let mut tools: Vec<Arc<dyn Capability>> = Vec::new();
        let store = Arc::new(VariableStore::new(config.emit_logging_commands));
        let client = Arc::new(DevOpsClient::new(
            Arc::clone(&store),
            Duration::from_secs(config.devops_timeout_secs),
        ));

        if config.pipeline {
            tools.push(Arc::new(GetPipelineVariableTool::new(Arc::clone(&store))));
            tools.push(Arc::new(SetPipelineVariableTool::new(Arc::clone(&store))));
            tools.push(Arc::new(GetPipelineTimelineTool::new(Arc::clone(&client))));
        }

        if config.filesystem {
            tools.push(Arc::new(ReadFileTool::new(workspace.to_path_buf())));
            tools.push(Arc::new(WriteFileTool::new(workspace.to_path_buf())));
            tools.push(Arc::new(ListDirectoryTool::new(workspace.to_path_buf())));
        }

        if config.execute_command {
            tools.push(Arc::new(
                ExecuteCommandTool::new(workspace.to_path_buf())
                    .with_timeout(Duration::from_secs(config.command_timeout_secs)),
            ));
        }

        if config.environment {
            tools.push(Arc::new(GetEnvironmentVariableTool));
        }

        if config.git {
            tools.push(Arc::new(GetCommitInfoTool::new(Arc::clone(&client))));
            tools.push(Arc::new(GetPullRequestInfoTool::new(Arc::clone(&client))));
            tools.push(Arc::new(GetRepositoryInfoTool::new(Arc::clone(&client))));
            tools.push(Arc::new(GetBranchPolicyTool::new(Arc::clone(&client))));
        }

        if config.build {
            tools.push(Arc::new(GetBuildChangesTool::new(Arc::clone(&client))));
            tools.push(Arc::new(GetBuildInfoTool::new(Arc::clone(&client))));
            tools.push(Arc::new(GetTestResultsTool::new(Arc::clone(&client))));
            tools.push(Arc::new(CheckArtifactExistsTool::new(Arc::clone(&client))));
            tools.push(Arc::new(GetBuildWorkItemsTool::new(client)));
        }

        if config.notification {
            tools.push(Arc::new(SendNotificationTool::new(store)));
        }

        Self::new(tools)
    }

    /// Add a capability; names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Capability>) -> Result<(), EngineError> {
        if self.get(tool.name()).is_some() {
            return Err(EngineError::DuplicateTool(tool.name().to_string()));
        }
        debug!("Registered tool '{}'", tool.name());
        self.tools.push(tool);
        Ok(())
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.tools.iter().find(|t| t.name() == name).map(Arc::clone)
    }

    /// Names of all registered tools, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Capability>> {
        self.tools.iter()
    }

    /// One `- name: description` line per capability.
    pub fn render_catalog(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
