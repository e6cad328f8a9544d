//! Conductor Replanner
//!
//! After every executed step the replanner either ends the run with a
//! response or replaces the remaining plan. It is the only node that sets
//! `response`. Every failure path resolves to termination so a misbehaving
//! oracle can never keep the loop alive.
//!
//! Progress analysis relies on substring heuristics over step outcomes. The
//! per-mode completion check is pluggable so a structured signal can replace
//! the text matching without touching the state machine.

use crate::llm::{extract_json, LLMProvider, Message};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::prompt;
use super::state::{ExecutionState, PastStep, StateUpdate, TaskMode};

pub const COMPLETED_RESPONSE: &str = "Task completed successfully";
pub const NO_ESSENTIAL_STEPS_RESPONSE: &str =
    "Task completed - no additional essential steps identified";
pub const REPLAN_ERROR_RESPONSE: &str = "Task completed with errors during replanning";

/// Shortest step text still considered actionable
const MIN_STEP_CHARS: usize = 10;

/// Decides from history whether a mode's goal has been reached
pub type CompletionCheck = Arc<dyn Fn(&[PastStep]) -> bool + Send + Sync>;

/// Decision mode: a variable or decision has been recorded
pub fn decision_recorded(steps: &[PastStep]) -> bool {
    steps.iter().any(|s| {
        s.outcome.contains("variable")
            || s.outcome.contains("decision")
            || s.outcome.contains("set")
            || s.step.contains("set_pipeline_variable")
    })
}

/// Execution mode: a command has run
pub fn commands_executed(steps: &[PastStep]) -> bool {
    steps.iter().any(|s| {
        s.outcome.contains("executed")
            || s.outcome.contains("completed")
            || s.outcome.contains("success")
            || s.step.contains("execute_command")
    })
}

fn information_gathered(steps: &[PastStep]) -> bool {
    steps.iter().any(|s| {
        s.outcome.contains("file")
            || s.outcome.contains("read")
            || s.outcome.contains("found")
            || s.outcome.contains("analyzed")
    })
}

fn recent_errors(steps: &[PastStep]) -> usize {
    steps[steps.len().saturating_sub(3)..]
        .iter()
        .filter(|s| {
            s.outcome.contains("error")
                || s.outcome.contains("failed")
                || s.outcome.contains("not found")
        })
        .count()
}

/// False for vague or filler steps the loop should not spend a tick on
pub fn is_essential(step: &str) -> bool {
    let lower = step.to_lowercase();
    let vague = (lower.contains("analyze") && lower.contains("determine"))
        || (lower.contains("review") && lower.contains("check"));
    let filler = lower == "continue" || lower == "proceed";

    !(vague || filler || step.chars().count() < MIN_STEP_CHARS)
}

pub fn filter_steps(steps: Vec<String>) -> Vec<String> {
    steps.into_iter().filter(|s| is_essential(s)).collect()
}

/// What the oracle asked for
#[derive(Debug, Clone, PartialEq)]
enum ReplanDecision {
    Respond(String),
    Continue(Vec<String>),
    Unrecognized,
}

fn parse_decision(content: &str) -> Result<ReplanDecision, serde_json::Error> {
    let value: Value = serde_json::from_str(extract_json(content).trim())?;

    if let Some(Value::String(response)) = value.get("response") {
        if !response.is_empty() {
            return Ok(ReplanDecision::Respond(response.clone()));
        }
    }

    if let Some(Value::Array(steps)) = value.get("action").and_then(|a| a.get("steps")) {
        let steps = steps
            .iter()
            .filter_map(|s| s.as_str().map(str::to_string))
            .collect();
        return Ok(ReplanDecision::Continue(steps));
    }

    Ok(ReplanDecision::Unrecognized)
}

pub struct Replanner {
    llm: Arc<dyn LLMProvider>,
    completion_checks: HashMap<TaskMode, CompletionCheck>,
}

impl Replanner {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        let mut completion_checks: HashMap<TaskMode, CompletionCheck> = HashMap::new();
        completion_checks.insert(TaskMode::Decision, Arc::new(decision_recorded));
        completion_checks.insert(TaskMode::Execution, Arc::new(commands_executed));
        Self {
            llm,
            completion_checks,
        }
    }

    /// Replace the completion check for one mode
    pub fn with_completion_check(mut self, mode: TaskMode, check: CompletionCheck) -> Self {
        self.completion_checks.insert(mode, check);
        self
    }

    /// Decide whether to finish or continue
    pub async fn replan(&self, state: &ExecutionState) -> StateUpdate {
        info!(
            "Replanning: {} completed, {} remaining",
            state.past_steps.len(),
            state.plan.len()
        );

        let system = Message::system(self.build_prompt(state));
        let response = match self.llm.generate(&[system]).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Replanning failed: {}", e);
                return StateUpdate::response(REPLAN_ERROR_RESPONSE);
            }
        };
        debug!("Replanner raw response: {}", response);

        match parse_decision(&response) {
            Ok(ReplanDecision::Respond(response)) => {
                info!("Task complete: {}", prompt::truncate(&response, 200));
                StateUpdate::response(response)
            }
            Ok(ReplanDecision::Continue(steps)) => {
                let proposed = steps.len();
                let steps = filter_steps(steps);
                if steps.is_empty() {
                    info!(
                        "All {} proposed steps were non-essential; completing task",
                        proposed
                    );
                    return StateUpdate::response(NO_ESSENTIAL_STEPS_RESPONSE);
                }

                info!(
                    "Plan updated with {} essential steps ({} filtered)",
                    steps.len(),
                    proposed - steps.len()
                );
                for (i, step) in steps.iter().enumerate() {
                    debug!("  {}. {}", i + 1, step);
                }
                StateUpdate::plan(steps)
            }
            Ok(ReplanDecision::Unrecognized) => {
                info!("No valid action provided; completing task");
                StateUpdate::response(COMPLETED_RESPONSE)
            }
            Err(e) => {
                warn!("Failed to parse replanner response: {}", e);
                StateUpdate::response(REPLAN_ERROR_RESPONSE)
            }
        }
    }

    /// Progress summary rendered into the replanning prompt
    pub fn analyze_progress(&self, state: &ExecutionState) -> String {
        let mut analysis = Vec::new();

        if let Some(mode) = state.mode() {
            if let Some(check) = self.completion_checks.get(&mode) {
                let status = match (mode, check(&state.past_steps)) {
                    (TaskMode::Decision, true) => "ACHIEVED - Variable/decision set",
                    (TaskMode::Decision, false) => "Pending - No decision variable set yet",
                    (TaskMode::Execution, true) => "ACHIEVED - Commands executed",
                    (TaskMode::Execution, false) => "Pending - No execution completed yet",
                };
                let label = match mode {
                    TaskMode::Decision => "Decision",
                    TaskMode::Execution => "Execution",
                };
                analysis.push(format!("{} mode completion: {}", label, status));
            }
        }

        analysis.push(format!(
            "Information gathering: {}",
            if information_gathered(&state.past_steps) {
                "COMPLETED - Data collected"
            } else {
                "Minimal - Limited information gathered"
            }
        ));

        let errors = recent_errors(&state.past_steps);
        if errors > 0 {
            analysis.push(format!(
                "Error status: {} recent errors detected - consider completion with current results",
                errors
            ));
        }

        analysis.join("\n")
    }

    fn build_prompt(&self, state: &ExecutionState) -> String {
        let recent = state.past_steps[state.past_steps.len().saturating_sub(2)..]
            .iter()
            .map(|s| format!("\"{}\" → \"{}\"", s.step, s.outcome))
            .collect::<Vec<_>>()
            .join("; ");

        format!(
            "You are a replanning agent. Your job is to analyze progress and decide whether to continue or complete the task.\n\n\
            CURRENT OBJECTIVE: {objective}\n\
            EXECUTION MODE: {mode}\n\n\
            PROGRESS ANALYSIS:\n\
            - Completed steps: {completed}\n\
            - Remaining planned steps: {remaining}\n\
            - Recent results: {recent}\n\n\
            COMPLETION STATUS ANALYSIS:\n\
            {analysis}\n\n\
            DECISION CRITERIA:\n\
            1. **COMPLETE THE TASK** if any of these conditions are met:\n   \
            - For DECISION mode: A pipeline variable has been successfully set\n   \
            - For EXECUTION mode: Required commands have been executed successfully\n   \
            - You have gathered sufficient information to answer the original objective\n   \
            - Recent steps show the main goal has been achieved\n   \
            - Continuing would add no meaningful value\n\n\
            2. **CONTINUE WITH NEW STEPS** only if:\n   \
            - Critical information is still missing for the objective\n   \
            - Essential actions have not been completed\n   \
            - The objective genuinely cannot be answered with current progress\n\n\
            MODE-SPECIFIC COMPLETION INDICATORS:\n\
            - Decision mode: Look for successful variable setting, decision making, or analysis completion\n\
            - Execution mode: Look for successful command execution or process completion\n\n\
            INSTRUCTIONS:\n\
            - Be decisive about completion - avoid unnecessary additional steps\n\
            - Focus on the CORE objective, not peripheral tasks\n\
            - If you can provide a meaningful answer based on completed work, do so\n\
            - Only add steps that are absolutely essential\n\
            - Never repeat steps that have already been completed\n\n\
            Output ONLY a JSON object:\n\n\
            For completion:\n\
            {{\n  \"response\": \"Clear answer based on completed steps and current context\"\n}}\n\n\
            For continuation (use sparingly):\n\
            {{\n  \"action\": {{\n    \"steps\": [\"essential_step_1\", \"essential_step_2\"]\n  }}\n}}",
            objective = state.objective,
            mode = state.mode_label(),
            completed = state.past_steps.len(),
            remaining = state.plan.len(),
            recent = recent,
            analysis = self.analyze_progress(state),
        )
    }
}
