//! Pipeline variables
//!
//! A run-scoped variable store shared by `get_pipeline_variable` and
//! `set_pipeline_variable`. Setting a variable also emits the Azure Pipelines
//! logging commands on stdout so a hosting pipeline agent picks the value up
//! for later tasks (plain and `isOutput=true` forms).
//!
//! Lookups consult the store first, then the environment using the agent's
//! naming convention (`Build.Reason` is exposed as `BUILD_REASON`).

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Variables set during a run
#[derive(Debug, Default)]
pub struct VariableStore {
    values: RwLock<HashMap<String, String>>,
    emit_logging_commands: bool,
}

impl VariableStore {
    /// Create a store that echoes `##vso` logging commands on every set
    pub fn new(emit_logging_commands: bool) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            emit_logging_commands,
        }
    }

    /// Look up a variable: store first, then the environment
    pub fn get(&self, name: &str) -> Option<String> {
        let stored = self
            .values
            .read()
            .ok()
            .and_then(|values| values.get(name).cloned());

        stored.or_else(|| {
            std::env::var(env_name(name))
                .ok()
                .filter(|v| !v.is_empty())
        })
    }

    /// Record a variable and publish it to the hosting pipeline
    pub fn set(&self, name: &str, value: &str) {
        match self.values.write() {
            Ok(mut values) => {
                values.insert(name.to_string(), value.to_string());
            }
            Err(e) => warn!("Variable store lock poisoned: {}", e),
        }

        if self.emit_logging_commands {
            for line in logging_commands(name, value) {
                println!("{}", line);
            }
        }
    }

    /// Snapshot of everything set so far
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.values
            .read()
            .map(|values| values.clone())
            .unwrap_or_default()
    }
}

/// Environment name a pipeline agent uses for a variable
fn env_name(name: &str) -> String {
    name.replace('.', "_").to_uppercase()
}

/// The two `##vso` lines that publish a variable
pub fn logging_commands(name: &str, value: &str) -> [String; 2] {
    [
        format!("##vso[task.setvariable variable={}]{}", name, value),
        format!(
            "##vso[task.setvariable variable={};isOutput=true]{}",
            name, value
        ),
    ]
}

/// Get the value of a pipeline variable by name
#[derive(Debug, Clone)]
pub struct GetPipelineVariableTool {
    store: Arc<VariableStore>,
}

impl GetPipelineVariableTool {
    pub fn new(store: Arc<VariableStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for GetPipelineVariableTool {
    fn name(&self) -> &str {
        "get_pipeline_variable"
    }

    fn description(&self) -> &str {
        "Get the value of a pipeline variable by name"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let name = input.trim();
        if name.is_empty() {
            return ToolResult::failure(self.name(), "Variable name is required");
        }

        match self.store.get(name) {
            Some(value) => {
                info!("Pipeline variable found: {}", name);
                ToolResult::text(self.name(), value)
            }
            None => {
                info!("Pipeline variable not found: {}", name);
                ToolResult::ok(self.name(), serde_json::Value::Null)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetRequest {
    name: String,
    #[serde(default)]
    value: serde_json::Value,
}

/// Parse `{"name","value"}` or `name=value`
fn parse_set_input(input: &str) -> Result<(String, String), String> {
    if let Ok(request) = serde_json::from_str::<SetRequest>(input) {
        let value = match request.value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        return Ok((request.name.trim().to_string(), value));
    }

    let parts: Vec<&str> = input.split('=').collect();
    if parts.len() != 2 {
        return Err(
            r#"Input must be JSON {"name": "varName", "value": "varValue"} or name=value format"#
                .to_string(),
        );
    }
    Ok((parts[0].trim().to_string(), parts[1].trim().to_string()))
}

/// Set a pipeline variable that can be used by subsequent tasks
#[derive(Debug, Clone)]
pub struct SetPipelineVariableTool {
    store: Arc<VariableStore>,
}

impl SetPipelineVariableTool {
    pub fn new(store: Arc<VariableStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for SetPipelineVariableTool {
    fn name(&self) -> &str {
        "set_pipeline_variable"
    }

    fn description(&self) -> &str {
        "Set a pipeline variable that can be used by subsequent tasks"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let (name, value) = match parse_set_input(input) {
            Ok(parsed) => parsed,
            Err(e) => return ToolResult::failure(self.name(), e),
        };

        if name.is_empty() {
            return ToolResult::failure(self.name(), "Variable name is required");
        }

        info!("Setting pipeline variable: {} = {}", name, value);
        self.store.set(&name, &value);

        ToolResult::ok(self.name(), json!({ "name": name, "value": value }))
    }
}
