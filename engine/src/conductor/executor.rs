//! Conductor Executor
//!
//! Executes the head of the plan. The oracle classifies the step as pure
//! reasoning or as needing capabilities; requested capabilities are invoked
//! concurrently and their outcomes joined in request order once all settle.
//!
//! The consumed step is always popped and recorded, even when the oracle
//! call or its parsing fails, so a single bad step never blocks progress.

use crate::llm::{extract_json, LLMProvider, Message};
use crate::tools::ToolRegistry;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::prompt;
use super::state::{ExecutionState, StateUpdate};

pub const NO_PLAN_STEP: &str = "No plan available";
pub const NO_PLAN_OUTCOME: &str = "Unable to execute - no plan found";
pub const INVALID_FORMAT_OUTCOME: &str = "Invalid execution format - no result produced";

/// A single requested capability call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInvocation {
    pub name: String,
    pub input: String,
}

#[derive(Debug, Deserialize)]
struct RawInvocation {
    tool: String,
    #[serde(default)]
    input: Value,
}

impl From<RawInvocation> for CapabilityInvocation {
    fn from(raw: RawInvocation) -> Self {
        // Models sometimes send structured input; capabilities take text.
        let input = match raw.input {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            name: raw.tool,
            input,
        }
    }
}

/// The two shapes the oracle may answer with
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StepDecision {
    Reasoning {
        #[serde(default)]
        result: Value,
    },
    Tools {
        tools: Vec<RawInvocation>,
    },
}

pub struct Executor {
    llm: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
}

impl Executor {
    pub fn new(llm: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self { llm, tools }
    }

    /// Execute the first remaining step
    pub async fn execute(&self, state: &ExecutionState) -> StateUpdate {
        let Some(current) = state.plan.first() else {
            warn!("No plan available to execute");
            return StateUpdate::step(NO_PLAN_STEP, NO_PLAN_OUTCOME);
        };

        let start = Instant::now();
        info!(
            "Executing step {} of {}: {}",
            state.past_steps.len() + 1,
            state.past_steps.len() + state.plan.len(),
            current
        );

        let outcome = match self.run_step(current, state).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Step execution failed: {}", e);
                format!("Execution failed: {}", e)
            }
        };

        info!(
            "Step finished in {:.1}s: {}",
            start.elapsed().as_secs_f64(),
            prompt::truncate(&outcome, 200)
        );

        StateUpdate::step(current.clone(), outcome).with_plan(state.plan[1..].to_vec())
    }

    async fn run_step(&self, step: &str, state: &ExecutionState) -> anyhow::Result<String> {
        let system = Message::system(self.build_prompt(step, state));
        let response = self.llm.generate(&[system]).await?;
        debug!("Executor raw response: {}", response);

        let value: Value = serde_json::from_str(extract_json(&response).trim())?;
        Ok(self.interpret(value).await)
    }

    /// Turn a parsed oracle answer into the step outcome
    async fn interpret(&self, value: Value) -> String {
        match serde_json::from_value::<StepDecision>(value) {
            Ok(StepDecision::Reasoning { result }) => match result {
                Value::String(text) => text,
                Value::Null => {
                    warn!("Reasoning response carried no result");
                    INVALID_FORMAT_OUTCOME.to_string()
                }
                other => other.to_string(),
            },
            Ok(StepDecision::Tools { tools }) => {
                let invocations: Vec<CapabilityInvocation> =
                    tools.into_iter().map(CapabilityInvocation::from).collect();
                self.invoke_all(&invocations).await
            }
            Err(e) => {
                warn!("Unrecognized execution response: {}", e);
                INVALID_FORMAT_OUTCOME.to_string()
            }
        }
    }

    /// Dispatch every invocation concurrently; outcomes keep request order.
    pub async fn invoke_all(&self, invocations: &[CapabilityInvocation]) -> String {
        info!("Invoking {} tool(s)", invocations.len());

        let outcomes = join_all(invocations.iter().map(|invocation| self.invoke(invocation))).await;
        outcomes.join("\n")
    }

    async fn invoke(&self, invocation: &CapabilityInvocation) -> String {
        let Some(tool) = self.tools.get(&invocation.name) else {
            warn!("Unknown tool requested: {}", invocation.name);
            return format!("Unknown tool: {}", invocation.name);
        };

        debug!("Calling {} with input: {}", tool.name(), invocation.input);
        let mut result = tool.execute(&invocation.input).await;
        result.name = tool.name().to_string();
        if !result.success {
            warn!("Tool {} failed: {:?}", tool.name(), result.error);
        }
        result.summary()
    }

    fn build_prompt(&self, step: &str, state: &ExecutionState) -> String {
        format!(
            "You are an execution agent. Your job is to execute the given step.\n\n\
            Current step: {step}\n\
            Mode: {mode}\n\
            Context: {context}\n\n\
            {tools}\n\n\
            EXECUTION STRATEGY:\n\
            1. First determine if this step requires tool calls or is just reasoning/analysis\n\
            2. If the step is pure reasoning, analysis, or planning - respond with just your analysis\n\
            3. If the step requires gathering information or performing actions - use appropriate tools\n\n\
            WHEN TO USE TOOLS:\n\
            - Use tools when you need to: read files, get variables, execute commands, list directories, etc.\n\
            - Do NOT use tools for: reasoning, analysis, planning, decision-making based on existing context\n\n\
            MODE-SPECIFIC REQUIREMENTS:\n\
            {requirements}\n\n\
            Respond with ONE of these formats:\n\n\
            For reasoning/analysis steps:\n\
            {{\n  \"type\": \"reasoning\",\n  \"result\": \"Your analysis or reasoning result\"\n}}\n\n\
            For tool-requiring steps:\n\
            {{\n  \"type\": \"tools\",\n  \"tools\": [\n    {{\"tool\": \"tool_name\", \"input\": \"tool_input\"}}\n  ]\n}}",
            step = step,
            mode = state.mode_label(),
            context = prompt::render_context(&state.context),
            tools = prompt::capability_section(&self.tools),
            requirements = prompt::mode_tool_requirements(),
        )
    }
}
