//! Parsed task records and their submission results.
//!
//! # Invariants
//! - `title` and `description` are non-empty after trimming
//! - Records are immutable once constructed (fields are private)

use serde::Serialize;

/// A title/description pair destined for task creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    title: String,
    description: String,
}

impl TaskRecord {
    /// Create a record from untrimmed parts.
    ///
    /// # Postcondition
    /// Both fields are stored trimmed and non-empty.
    ///
    /// # Errors
    /// Returns `Err` if either part is empty after trimming.
    pub fn new(title: &str, description: &str) -> Result<Self, TaskError> {
        let title = title.trim();
        let description = description.trim();

        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        if description.is_empty() {
            return Err(TaskError::EmptyDescription);
        }

        Ok(Self {
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Outcome of creating one task in the remote list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// The task API answered 201 Created.
    Created,
    /// Any other status (`status` set) or a transport failure (`status` unset).
    Failed {
        status: Option<u16>,
        reason: String,
    },
}

impl SubmissionOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, SubmissionOutcome::Created)
    }
}

/// One result per submitted record, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSubmissionResult {
    pub record: TaskRecord,
    #[serde(flatten)]
    pub outcome: SubmissionOutcome,
}

/// Errors that can occur while constructing task records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Task description cannot be empty")]
    EmptyDescription,
}
