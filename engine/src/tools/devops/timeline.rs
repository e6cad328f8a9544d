//! Pipeline timeline

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{DevOpsClient, DevOpsError};

/// Stage, job and task records of the current build with their timings
#[derive(Debug, Clone)]
pub struct GetPipelineTimelineTool {
    client: Arc<DevOpsClient>,
}

impl GetPipelineTimelineTool {
    pub fn new(client: Arc<DevOpsClient>) -> Self {
        Self { client }
    }

    async fn timeline(&self) -> Result<serde_json::Value, DevOpsError> {
        let build_id = self.client.require("Build.BuildId")?;
        let timeline = self
            .client
            .get(&format!("/build/builds/{}/timeline", build_id))
            .await?;

        let records = timeline
            .get("records")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();
        info!("Timeline for build {} has {} records", build_id, records.len());

        Ok(json!({
            "records": records,
            "lastChangedBy": timeline.get("lastChangedBy").cloned().unwrap_or_default(),
            "lastChangedOn": timeline.get("lastChangedOn").cloned().unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl Capability for GetPipelineTimelineTool {
    fn name(&self) -> &str {
        "get_pipeline_timeline"
    }

    fn description(&self) -> &str {
        "Get pipeline execution timeline and performance metrics"
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        match self.timeline().await {
            Ok(result) => ToolResult::ok(self.name(), result),
            Err(e) => ToolResult::failure(self.name(), e.to_string()),
        }
    }
}
