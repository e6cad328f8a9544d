//! Execution state and merge rules
//!
//! `ExecutionState` is the single record threaded through a run. Nodes never
//! mutate it directly; each returns a `StateUpdate` delta which the conductor
//! merges with [`ExecutionState::apply`]:
//!
//! - `context` is shallow-merged (new keys overlay old ones, `mode` is fixed)
//! - `plan` and `response` are replaced
//! - `past_steps` is appended
//!
//! Once `response` is set the state is terminal and further plan or history
//! changes are dropped.

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Context key holding the run mode
pub const MODE_KEY: &str = "mode";

/// What the final step of a run must accomplish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    /// Analyze context and record a decision as a pipeline variable
    Decision,
    /// Analyze context and run shell commands
    Execution,
}

impl TaskMode {
    pub const ALL: [TaskMode; 2] = [TaskMode::Decision, TaskMode::Execution];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskMode::Decision => "decision",
            TaskMode::Execution => "execution",
        }
    }

    /// Capability the final step of a run in this mode must use
    pub fn required_capability(&self) -> &'static str {
        match self {
            TaskMode::Decision => "set_pipeline_variable",
            TaskMode::Execution => "execute_command",
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decision" => Ok(TaskMode::Decision),
            "execution" => Ok(TaskMode::Execution),
            _ => Err(EngineError::InvalidMode(s.to_string())),
        }
    }
}

/// One completed plan step and what came of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastStep {
    pub step: String,
    pub outcome: String,
}

impl PastStep {
    pub fn new(step: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            outcome: outcome.into(),
        }
    }
}

/// The record threaded through one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionState {
    /// Original objective, fixed at construction
    pub objective: String,

    /// Remaining step descriptions, consumed from the front
    pub plan: Vec<String>,

    /// Append-only ledger of completed work, in execution order
    pub past_steps: Vec<PastStep>,

    /// Contextual data shared with every prompt
    pub context: Map<String, Value>,

    /// Final answer; its presence ends the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ExecutionState {
    pub fn new(objective: impl Into<String>, context: Map<String, Value>) -> Self {
        Self {
            objective: objective.into(),
            context,
            ..Self::default()
        }
    }

    /// Mode label as recorded in context
    pub fn mode_label(&self) -> &str {
        self.context
            .get(MODE_KEY)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }

    /// Mode recorded in context, if it names a known mode
    pub fn mode(&self) -> Option<TaskMode> {
        self.mode_label().parse().ok()
    }

    pub fn is_terminal(&self) -> bool {
        self.response.is_some()
    }

    /// Merge a node's delta into the state
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(context) = update.context {
            for (key, value) in context {
                if key == MODE_KEY && self.context.contains_key(MODE_KEY) {
                    debug!("Ignoring attempt to change run mode");
                    continue;
                }
                self.context.insert(key, value);
            }
        }

        if self.is_terminal() {
            if update.plan.is_some() || !update.past_steps.is_empty() || update.response.is_some()
            {
                debug!("State is terminal; dropping plan/history/response update");
            }
            return;
        }

        if let Some(plan) = update.plan {
            self.plan = plan;
        }
        self.past_steps.extend(update.past_steps);
        if let Some(response) = update.response {
            self.response = Some(response);
        }
    }
}

/// A partial update returned by a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub plan: Option<Vec<String>>,
    pub past_steps: Vec<PastStep>,
    pub context: Option<Map<String, Value>>,
    pub response: Option<String>,
}

impl StateUpdate {
    /// Replace the remaining plan
    pub fn plan(steps: Vec<String>) -> Self {
        Self {
            plan: Some(steps),
            ..Self::default()
        }
    }

    /// Record one completed step
    pub fn step(step: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            past_steps: vec![PastStep::new(step, outcome)],
            ..Self::default()
        }
    }

    /// Set the final response
    pub fn response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            ..Self::default()
        }
    }

    pub fn with_plan(mut self, steps: Vec<String>) -> Self {
        self.plan = Some(steps);
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }
}

/// Outcome of a run as seen by its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    pub fn completed(response: Option<String>) -> Self {
        Self {
            success: true,
            response,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("decision".parse::<TaskMode>().unwrap(), TaskMode::Decision);
        assert_eq!(" Execution ".parse::<TaskMode>().unwrap(), TaskMode::Execution);

        let err = "deploy".parse::<TaskMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid mode 'deploy'. Must be one of: decision, execution"
        );
    }

    #[test]
    fn test_required_capability() {
        assert_eq!(TaskMode::Decision.required_capability(), "set_pipeline_variable");
        assert_eq!(TaskMode::Execution.required_capability(), "execute_command");
    }

    #[test]
    fn test_plan_is_replaced_and_history_appended() {
        let mut state = ExecutionState::new("obj", Map::new());
        state.apply(StateUpdate::plan(vec!["a".into(), "b".into()]));
        state.apply(StateUpdate::step("a", "done").with_plan(vec!["b".into()]));
        state.apply(StateUpdate::step("b", "done too").with_plan(vec![]));

        assert!(state.plan.is_empty());
        assert_eq!(
            state.past_steps,
            vec![PastStep::new("a", "done"), PastStep::new("b", "done too")]
        );
    }

    #[test]
    fn test_context_is_shallow_merged_and_mode_is_fixed() {
        let mut state = ExecutionState::new(
            "obj",
            context(json!({"mode": "decision", "branch": "main", "nested": {"a": 1}})),
        );
        state.apply(StateUpdate::default().with_context(context(
            json!({"mode": "execution", "branch": "dev", "nested": {"b": 2}}),
        )));

        assert_eq!(state.mode(), Some(TaskMode::Decision));
        assert_eq!(state.context["branch"], "dev");
        assert_eq!(state.context["nested"], json!({"b": 2}));
    }

    #[test]
    fn test_response_is_terminal() {
        let mut state = ExecutionState::new("obj", Map::new());
        state.apply(StateUpdate::plan(vec!["a".into()]));
        state.apply(StateUpdate::response("finished"));
        assert!(state.is_terminal());

        state.apply(StateUpdate::step("late", "ignored").with_plan(vec!["x".into()]));
        state.apply(StateUpdate::response("overwrite"));

        assert_eq!(state.response.as_deref(), Some("finished"));
        assert_eq!(state.plan, vec!["a".to_string()]);
        assert!(state.past_steps.is_empty());
    }

    #[test]
    fn test_mode_label_defaults() {
        let state = ExecutionState::new("obj", Map::new());
        assert_eq!(state.mode_label(), "unknown");
        assert_eq!(state.mode(), None);
    }

    #[test]
    fn test_run_result_serialization() {
        let ok = serde_json::to_value(RunResult::completed(Some("done".into()))).unwrap();
        assert_eq!(ok, json!({"success": true, "response": "done"}));

        let failed = serde_json::to_value(RunResult::failed("boom")).unwrap();
        assert_eq!(failed, json!({"success": false, "error": "boom"}));
    }
}
