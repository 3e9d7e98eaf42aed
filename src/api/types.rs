//! API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::PipelineState;
use crate::task::{TaskRecord, TaskSubmissionResult};

/// Request to start a new run.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    /// The goal to break down
    pub goal: String,

    /// Completion API key (falls back to `XAI_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Target To Do list id (falls back to `TODO_LIST_ID`)
    #[serde(default)]
    pub list_id: Option<String>,
}

/// Generated tasks for a new run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub run_id: Uuid,
    pub goal: String,
    /// Raw completion text
    pub completion: String,
    pub tasks: Vec<TaskRecord>,
    pub state: PipelineState,
}

/// Body of `POST /api/pareto/continue`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContinueRequest {
    /// Keep polling until sign-in finishes instead of checking once
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContinueResponse {
    /// Sign-in not finished yet.
    Pending { retry_after_secs: u64 },
    /// Signed in; one result per task.
    Done {
        created: usize,
        failed: usize,
        results: Vec<TaskSubmissionResult>,
    },
}

impl ContinueResponse {
    pub fn done(results: Vec<TaskSubmissionResult>) -> Self {
        let created = results.iter().filter(|r| r.outcome.is_created()).count();
        Self::Done {
            created,
            failed: results.len() - created,
            results,
        }
    }
}

/// Current run state.
#[derive(Debug, Clone, Serialize)]
pub struct StateResponse {
    /// `None` before the first run
    pub run_id: Option<Uuid>,

    #[serde(flatten)]
    pub state: PipelineState,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
