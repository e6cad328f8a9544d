//! Environment variable lookup

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use tracing::info;

/// Read a process environment variable; unset yields a `null` result.
#[derive(Debug, Clone, Default)]
pub struct GetEnvironmentVariableTool;

#[async_trait]
impl Capability for GetEnvironmentVariableTool {
    fn name(&self) -> &str {
        "get_environment_variable"
    }

    fn description(&self) -> &str {
        "Get the value of an environment variable"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let name = input.trim();
        if name.is_empty() {
            return ToolResult::failure(self.name(), "Variable name is required");
        }

        match std::env::var(name) {
            Ok(value) if !value.is_empty() => {
                info!("Environment variable found: {}", name);
                ToolResult::text(self.name(), value)
            }
            _ => {
                info!("Environment variable not found: {}", name);
                ToolResult::ok(self.name(), serde_json::Value::Null)
            }
        }
    }
}
