//! Goal-to-task pipeline.
//!
//! One [`PipelineOrchestrator`] per goal: generate tasks, sign in with a
//! device code, submit the tasks. See [`state`] for the state machine.

mod orchestrator;
mod prompt;
pub mod state;

pub use orchestrator::{GenerationSettings, PipelineError, PipelineOrchestrator, SignInStatus};
pub use prompt::pareto_prompt;
pub use state::{PipelineStage, PipelineState, SignInPrompt};
