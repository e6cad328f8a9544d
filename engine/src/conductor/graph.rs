//! Conductor state machine
//!
//! ```text
//! Planning -> Executing -> Replanning -+-> Executing
//!                                      +-> Terminal
//! ```
//!
//! Planning runs exactly once. After every replanning tick the run ends if a
//! response is set, the plan is empty, or more than `max_steps` steps have
//! completed. The step ceiling holds regardless of what the oracle or the
//! capabilities do.

use crate::llm::{LLMError, LLMProvider};
use crate::tools::ToolRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use super::context::ContextBuilder;
use super::executor::Executor;
use super::planner::Planner;
use super::prompt;
use super::replanner::{CompletionCheck, Replanner};
use super::state::{ExecutionState, RunResult, StateUpdate, TaskMode};
use sdk::errors::EngineError;

/// Default step ceiling
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Response written when the step ceiling ends a run
pub const STEP_LIMIT_RESPONSE: &str = "Task completed - maximum step limit reached";

/// Where the conductor is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    Executing,
    Replanning,
    Terminal,
}

pub struct Conductor {
    planner: Planner,
    executor: Executor,
    replanner: Replanner,
    max_steps: usize,
}

impl Conductor {
    pub fn new(llm: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            planner: Planner::new(Arc::clone(&llm), Arc::clone(&tools)),
            executor: Executor::new(Arc::clone(&llm), tools),
            replanner: Replanner::new(llm),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Override the step ceiling (values below 1 are raised to 1)
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Swap the completion heuristic used for one mode
    pub fn with_completion_check(mut self, mode: TaskMode, check: CompletionCheck) -> Self {
        self.replanner = self.replanner.with_completion_check(mode, check);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run one node and return the next phase.
    ///
    /// Only a planning-time oracle failure is propagated; every later failure
    /// is absorbed into the state by the node that hit it.
    pub async fn advance(
        &self,
        state: &mut ExecutionState,
        phase: Phase,
    ) -> Result<Phase, LLMError> {
        if state.is_terminal() {
            return Ok(Phase::Terminal);
        }

        match phase {
            Phase::Planning => {
                let update = self.planner.plan(state).await?;
                state.apply(update);
                Ok(Phase::Executing)
            }
            Phase::Executing => {
                let update = self.executor.execute(state).await;
                state.apply(update);
                Ok(Phase::Replanning)
            }
            Phase::Replanning => {
                let update = self.replanner.replan(state).await;
                state.apply(update);
                Ok(self.next_after_replan(state))
            }
            Phase::Terminal => Ok(Phase::Terminal),
        }
    }

    fn next_after_replan(&self, state: &mut ExecutionState) -> Phase {
        if state.is_terminal() {
            return Phase::Terminal;
        }
        if state.past_steps.len() > self.max_steps {
            warn!(
                "Step limit reached ({} > {}); ending run",
                state.past_steps.len(),
                self.max_steps
            );
            state.apply(StateUpdate::response(STEP_LIMIT_RESPONSE));
            return Phase::Terminal;
        }
        if state.plan.is_empty() {
            info!("Plan exhausted; ending run");
            return Phase::Terminal;
        }
        Phase::Executing
    }

    /// Drive a state from planning to termination
    pub async fn drive(&self, state: &mut ExecutionState) -> Result<(), LLMError> {
        let mut phase = Phase::Planning;
        while phase != Phase::Terminal {
            phase = self.advance(state, phase).await?;
        }
        Ok(())
    }

    /// Run contract: never panics and never returns an error, only a result.
    pub async fn execute(&self, objective: &str, mode: &str, context: Value) -> RunResult {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id, mode = %mode);

        async move {
            match self.run(objective, mode, context).await {
                Ok(state) => {
                    info!(
                        "Run finished after {} steps: {}",
                        state.past_steps.len(),
                        prompt::truncate(state.response.as_deref().unwrap_or("<no response>"), 200)
                    );
                    RunResult::completed(state.response)
                }
                Err(e) => {
                    warn!("Run failed: {}", e);
                    RunResult::failed(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        objective: &str,
        mode: &str,
        context: Value,
    ) -> Result<ExecutionState, EngineError> {
        let mode: TaskMode = mode.parse()?;
        if objective.trim().is_empty() {
            return Err(EngineError::EmptyObjective);
        }

        info!("Starting {} run: {}", mode, prompt::truncate(objective, 200));
        let context = ContextBuilder::new(mode).with_additional(context).build();
        let mut state = ExecutionState::new(objective, context);

        self.drive(&mut state)
            .await
            .map_err(|e| EngineError::LLMProvider(e.to_string()))?;

        Ok(state)
    }
}
