//! Conductor System
//!
//! Bounded plan, execute, replan loop. The planner produces a plan once, then
//! the executor consumes one step per tick and the replanner either refills
//! the plan or ends the run with a response.

pub mod context;
pub mod executor;
pub mod graph;
pub mod planner;
pub mod prompt;
pub mod replanner;
pub mod state;

pub use context::ContextBuilder;
pub use executor::{CapabilityInvocation, Executor};
pub use graph::{Conductor, Phase, DEFAULT_MAX_STEPS, STEP_LIMIT_RESPONSE};
pub use planner::Planner;
pub use replanner::{CompletionCheck, Replanner};
pub use state::{ExecutionState, PastStep, RunResult, StateUpdate, TaskMode};
