//! Filesystem capabilities
//!
//! `read_file`, `write_file` and `list_directory`. Relative paths resolve
//! against the configured workspace; absolute paths are used as given.
//! Failures are reported through `ToolResult`, never raised.

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Shared path resolution for the filesystem capabilities
#[derive(Debug, Clone)]
struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn resolve(&self, path: &str) -> PathBuf {
        let target = Path::new(path.trim());
        if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.root.join(target)
        }
    }
}

/// Read the contents of a file
#[derive(Debug, Clone)]
pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace: Workspace { root: workspace },
        }
    }
}

#[async_trait]
impl Capability for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let path = self.workspace.resolve(input);
        info!("Reading file: {}", path.display());

        match fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(
                    "File read: {} lines, {} bytes",
                    content.lines().count(),
                    content.len()
                );
                ToolResult::text(self.name(), content)
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                ToolResult::failure(
                    self.name(),
                    format!("Failed to read {}: {}", path.display(), e),
                )
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest {
    file_path: String,
    content: String,
}

/// Write content to a file, creating parent directories as needed
#[derive(Debug, Clone)]
pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace: Workspace { root: workspace },
        }
    }

    async fn write(&self, input: &str) -> Result<serde_json::Value, String> {
        let request: WriteRequest = serde_json::from_str(input)
            .map_err(|e| format!("filePath and content are required: {}", e))?;
        if request.file_path.trim().is_empty() {
            return Err("filePath and content are required".to_string());
        }

        let path = self.workspace.resolve(&request.file_path);
        info!("Writing file: {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    format!("Failed to create directories {}: {}", parent.display(), e)
                })?;
                debug!("Created directory: {}", parent.display());
            }
        }

        fs::write(&path, &request.content)
            .await
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;

        Ok(json!({
            "filePath": path.display().to_string(),
            "size": request.content.len(),
        }))
    }
}

#[async_trait]
impl Capability for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        match self.write(input).await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => {
                warn!("write_file failed: {}", e);
                ToolResult::failure(self.name(), e)
            }
        }
    }
}

/// List the contents of a directory
#[derive(Debug, Clone)]
pub struct ListDirectoryTool {
    workspace: Workspace,
}

impl ListDirectoryTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace: Workspace { root: workspace },
        }
    }

    async fn list(&self, path: &Path) -> Result<serde_json::Value, String> {
        if !path.exists() {
            return Err(format!("Directory does not exist: {}", path.display()));
        }
        if !path.is_dir() {
            return Err(format!("Path is not a directory: {}", path.display()));
        }

        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| format!("Failed to read directory {}: {}", path.display(), e))?;

        let mut details = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| e.to_string())? {
            let metadata = entry.metadata().await.map_err(|e| e.to_string())?;
            let modified = metadata
                .modified()
                .ok()
                .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());
            details.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "type": if metadata.is_dir() { "directory" } else { "file" },
                "size": metadata.len(),
                "modified": modified,
            }));
        }

        details.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
        debug!("Directory listing completed: {} items", details.len());
        Ok(serde_json::Value::Array(details))
    }
}

#[async_trait]
impl Capability for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the contents of a directory"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let input = if input.trim().is_empty() { "." } else { input };
        let path = self.workspace.resolve(input);
        info!("Listing directory: {}", path.display());

        match self.list(&path).await {
            Ok(listing) => ToolResult::ok(self.name(), listing),
            Err(e) => {
                warn!("list_directory failed: {}", e);
                ToolResult::failure(self.name(), e)
            }
        }
    }
}
