//! Conductor Planner
//!
//! Turns the objective and context into an ordered list of step descriptions.
//! Runs once per execution. A response that cannot be parsed degrades to a
//! single generic step instead of failing the run; only a transport failure
//! from the oracle propagates.

use crate::llm::{extract_json, LLMError, LLMProvider, Message};
use crate::tools::ToolRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::prompt;
use super::state::{ExecutionState, StateUpdate};

/// Plan used when the oracle's answer is unusable
pub const FALLBACK_STEP: &str = "Analyze the request and provide appropriate response";

pub struct Planner {
    llm: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self { llm, tools }
    }

    /// Produce the initial plan
    pub async fn plan(&self, state: &ExecutionState) -> Result<StateUpdate, LLMError> {
        info!("Planning: {}", prompt::truncate(&state.objective, 200));

        let system = Message::system(self.build_prompt(state.mode_label()));
        let user = Message::user(format!(
            "{}\n\nAvailable context: {}",
            state.objective,
            prompt::render_context(&state.context)
        ));

        let response = self.llm.generate(&[system, user]).await?;
        debug!("Planner raw response: {}", response);

        let steps = match parse_steps(&response) {
            Ok(steps) => steps,
            Err(e) => {
                warn!("Failed to parse plan response, using fallback plan: {}", e);
                vec![FALLBACK_STEP.to_string()]
            }
        };

        info!("Plan created with {} steps", steps.len());
        for (i, step) in steps.iter().enumerate() {
            debug!("  {}. {}", i + 1, step);
        }

        Ok(StateUpdate::plan(steps))
    }

    fn build_prompt(&self, mode: &str) -> String {
        format!(
            "For the given objective, come up with a simple step by step plan.\n\
            This plan should involve individual tasks, that if executed correctly will yield the correct answer. Do not add any superfluous steps.\n\
            The result of the final step should be the final answer. Make sure that each step has all the information needed - do not skip steps.\n\n\
            Mode: {mode}\n\
            {requirements}\n\n\
            {tools}\n\n\
            IMPORTANT:\n\
            - Only use tool calls when you need to gather information or perform actions\n\
            - Reasoning, analysis, and planning steps should NOT require tool calls\n\
            - Use tools only when you need to: read files, get variables, execute commands, etc.\n\
            - For Decision mode: Final step MUST use set_pipeline_variable tool to set the decision result\n\
            - For Execution mode: Final step MUST use execute_command tool to run the required commands\n\n\
            Output only a JSON object with this structure:\n\
            {{\n  \"steps\": [\"step1 description\", \"step2 description\", ...]\n}}",
            mode = mode,
            requirements = prompt::final_step_requirements(),
            tools = prompt::capability_section(&self.tools),
        )
    }
}

/// Parse `{"steps": [...]}`; a missing `steps` key is an empty plan.
pub(crate) fn parse_steps(content: &str) -> Result<Vec<String>, String> {
    let value: Value =
        serde_json::from_str(extract_json(content).trim()).map_err(|e| e.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| "plan response is not a JSON object".to_string())?;

    match object.get("steps") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(steps) => serde_json::from_value(steps.clone()).map_err(|e| e.to_string()),
    }
}
