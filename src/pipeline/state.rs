//! Externally visible pipeline states.
//!
//! # State Machine
//! ```text
//! Idle -> GeneratingTasks -> TasksReady -> Authenticating -> AwaitingUserSignIn -> Submitting -> Done
//!
//! GeneratingTasks | Authenticating | AwaitingUserSignIn -> Failed { stage, reason }
//! AwaitingUserSignIn -> TasksReady   (sign-in abandoned)
//! ```
//! `TasksReady` and `AwaitingUserSignIn` are pause points: the caller has to
//! act before the pipeline moves on.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::oauth::DeviceCodeSession;

/// Stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Generation,
    Authentication,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Generation => write!(f, "generation"),
            PipelineStage::Authentication => write!(f, "authentication"),
        }
    }
}

/// What the user needs to finish signing in on another device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInPrompt {
    pub verification_uri: String,
    pub user_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<&DeviceCodeSession> for SignInPrompt {
    fn from(session: &DeviceCodeSession) -> Self {
        Self {
            verification_uri: session.verification_uri().to_string(),
            user_code: session.user_code().to_string(),
            message: session.message().map(str::to_string),
            expires_at: session.expires_at(),
        }
    }
}

/// Current state of one goal-to-task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    GeneratingTasks,
    TasksReady { task_count: usize },
    Authenticating,
    AwaitingUserSignIn { prompt: SignInPrompt },
    Submitting { task_count: usize },
    Done { created: usize, failed: usize },
    Failed { stage: PipelineStage, reason: String },
}

impl PipelineState {
    /// Short name used in transition errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::GeneratingTasks => "generating tasks",
            PipelineState::TasksReady { .. } => "tasks ready",
            PipelineState::Authenticating => "authenticating",
            PipelineState::AwaitingUserSignIn { .. } => "awaiting sign-in",
            PipelineState::Submitting { .. } => "submitting",
            PipelineState::Done { .. } => "done",
            PipelineState::Failed { .. } => "failed",
        }
    }

    /// Check if the run has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done { .. } | PipelineState::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_state_tag() {
        let value = serde_json::to_value(PipelineState::Failed {
            stage: PipelineStage::Authentication,
            reason: "Sign-in code expired".to_string(),
        })
        .unwrap();
        assert_eq!(value["state"], "failed");
        assert_eq!(value["stage"], "authentication");

        let value = serde_json::to_value(PipelineState::TasksReady { task_count: 3 }).unwrap();
        assert_eq!(value, serde_json::json!({"state": "tasks_ready", "task_count": 3}));
    }

    #[test]
    fn terminal_states() {
        assert!(PipelineState::Done { created: 1, failed: 0 }.is_terminal());
        assert!(!PipelineState::TasksReady { task_count: 0 }.is_terminal());
        assert!(!PipelineState::Idle.is_terminal());
    }
}
