//! Drives one goal through generation, sign-in, and submission.
//!
//! The orchestrator owns everything a run accumulates (goal, raw completion,
//! parsed tasks, the pending sign-in) and publishes every state change on a
//! `watch` channel so observers never need the run's lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::prompt::pareto_prompt;
use super::state::{PipelineStage, PipelineState, SignInPrompt};
use crate::llm::{ChatMessage, ChatOptions, LlmClient, LlmError};
use crate::oauth::{AccessToken, AuthError, DeviceCodeAuthenticator, DeviceCodeSession, PollOutcome};
use crate::task::{parse_tasks, render_tasks, TaskRecord, TaskSubmissionResult};
use crate::todo::TaskSubmitter;

/// Model settings for the generation step.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u64,
}

/// Result of a single sign-in check.
#[derive(Debug)]
pub enum SignInStatus {
    /// The user hasn't finished yet. Check again after `retry_after`.
    Pending { retry_after: Duration },
    /// Signed in and every task was attempted.
    Completed(Vec<TaskSubmissionResult>),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Goal cannot be empty")]
    EmptyGoal,

    #[error("Completion failed: {0}")]
    Completion(#[from] LlmError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("No tasks to create")]
    NothingToSubmit,

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

pub struct PipelineOrchestrator {
    llm: Arc<dyn LlmClient>,
    authenticator: DeviceCodeAuthenticator,
    submitter: TaskSubmitter,
    generation: GenerationSettings,
    list_id: String,
    state_tx: watch::Sender<PipelineState>,
    goal: Option<String>,
    completion: Option<String>,
    tasks: Arc<[TaskRecord]>,
    session: Option<DeviceCodeSession>,
}

impl PipelineOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        authenticator: DeviceCodeAuthenticator,
        submitter: TaskSubmitter,
        generation: GenerationSettings,
        list_id: impl Into<String>,
    ) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            llm,
            authenticator,
            submitter,
            generation,
            list_id: list_id.into(),
            state_tx,
            goal: None,
            completion: None,
            tasks: Arc::from(Vec::new()),
            session: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state_tx.borrow().clone()
    }

    /// Receiver that sees every state this run moves through.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// Raw completion text, kept for display.
    pub fn completion(&self) -> Option<&str> {
        self.completion.as_deref()
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    fn set_state(&self, state: PipelineState) {
        tracing::debug!(state = state.name(), "Pipeline state changed");
        self.state_tx.send_replace(state);
    }

    fn fail(&self, stage: PipelineStage, reason: String) {
        tracing::error!(%stage, %reason, "Pipeline failed");
        self.set_state(PipelineState::Failed { stage, reason });
    }

    fn invalid(&self, action: &'static str) -> PipelineError {
        PipelineError::InvalidTransition {
            action,
            state: self.state_tx.borrow().name(),
        }
    }

    /// Turn `goal` into Pareto tasks with one completion request.
    ///
    /// Only valid from `Idle`. An empty goal is rejected before any request
    /// and leaves the state unchanged. Zero parsed tasks is not an error.
    pub async fn generate(&mut self, goal: &str) -> Result<&[TaskRecord], PipelineError> {
        if !matches!(*self.state_tx.borrow(), PipelineState::Idle) {
            return Err(self.invalid("generate tasks"));
        }
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(PipelineError::EmptyGoal);
        }

        self.goal = Some(goal.to_string());
        self.set_state(PipelineState::GeneratingTasks);

        let messages = [ChatMessage::user(pareto_prompt(goal))];
        let options = ChatOptions {
            max_tokens: Some(self.generation.max_tokens),
        };
        let response = self
            .llm
            .chat_completion(&self.generation.model, &messages, options)
            .await
            .and_then(|response| {
                tracing::debug!(
                    model = ?response.model,
                    finish_reason = ?response.finish_reason,
                    "Completion received"
                );
                response
                    .content
                    .ok_or_else(|| LlmError::parse("Completion had no content".to_string()))
            });

        let text = match response {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                self.fail(PipelineStage::Generation, e.to_string());
                return Err(e.into());
            }
        };

        let tasks = parse_tasks(&text);
        if tasks.is_empty() {
            tracing::warn!("Completion contained no task lines");
        } else {
            tracing::info!(count = tasks.len(), "Generated Pareto tasks");
            tracing::debug!("Tasks:\n{}", render_tasks(&tasks));
        }

        self.completion = Some(text);
        self.tasks = Arc::from(tasks);
        self.set_state(PipelineState::TasksReady {
            task_count: self.tasks.len(),
        });
        Ok(&self.tasks)
    }

    /// Start device sign-in for the generated tasks.
    ///
    /// Only valid from `TasksReady`. With no tasks this fails with
    /// [`PipelineError::NothingToSubmit`] and the state stays `TasksReady`.
    pub async fn begin_authentication(&mut self) -> Result<SignInPrompt, PipelineError> {
        if !matches!(*self.state_tx.borrow(), PipelineState::TasksReady { .. }) {
            return Err(self.invalid("create tasks"));
        }
        if self.tasks.is_empty() {
            return Err(PipelineError::NothingToSubmit);
        }

        self.set_state(PipelineState::Authenticating);
        match self.authenticator.begin().await {
            Ok(session) => {
                let prompt = SignInPrompt::from(&session);
                self.session = Some(session);
                self.set_state(PipelineState::AwaitingUserSignIn {
                    prompt: prompt.clone(),
                });
                Ok(prompt)
            }
            Err(e) => {
                self.fail(PipelineStage::Authentication, e.to_string());
                Err(e.into())
            }
        }
    }

    fn ensure_awaiting_sign_in(&self, action: &'static str) -> Result<(), PipelineError> {
        if matches!(
            *self.state_tx.borrow(),
            PipelineState::AwaitingUserSignIn { .. }
        ) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    /// Copy of the pending session to poll with. The stored session is only
    /// replaced or cleared once a poll has an answer, so a poll that is
    /// dropped halfway leaves the run resumable.
    fn pending_session(&self, action: &'static str) -> Result<DeviceCodeSession, PipelineError> {
        self.ensure_awaiting_sign_in(action)?;
        self.session.clone().ok_or_else(|| self.invalid(action))
    }

    /// Make one token request. Submits the tasks as soon as sign-in completes.
    pub async fn poll_sign_in(&mut self) -> Result<SignInStatus, PipelineError> {
        let session = self.pending_session("check sign-in")?;

        match self.authenticator.poll(session).await {
            Ok(PollOutcome::Pending(session)) => {
                let retry_after = session.next_poll_delay(Utc::now());
                self.session = Some(session);
                Ok(SignInStatus::Pending { retry_after })
            }
            Ok(PollOutcome::Authorized(token)) => {
                self.session = None;
                Ok(SignInStatus::Completed(self.submit(&token).await))
            }
            Err(e) => Err(self.sign_in_failed(e)),
        }
    }

    /// Poll until the user signs in, then submit every task.
    ///
    /// If `cancel` fires the pending sign-in is dropped and the run goes
    /// back to `TasksReady`, so the caller can start sign-in again. Once the
    /// token arrives the submission runs to the end; callers that may be
    /// dropped should run this on its own task.
    pub async fn wait_for_sign_in(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskSubmissionResult>, PipelineError> {
        let session = self.pending_session("wait for sign-in")?;

        match self.authenticator.wait_for_token(session, cancel).await {
            Ok(token) => {
                self.session = None;
                Ok(self.submit(&token).await)
            }
            Err(AuthError::Cancelled) => {
                tracing::info!("Sign-in cancelled");
                self.session = None;
                self.set_state(PipelineState::TasksReady {
                    task_count: self.tasks.len(),
                });
                Err(AuthError::Cancelled.into())
            }
            Err(e) => Err(self.sign_in_failed(e)),
        }
    }

    fn sign_in_failed(&mut self, err: AuthError) -> PipelineError {
        self.session = None;
        self.fail(PipelineStage::Authentication, err.to_string());
        err.into()
    }

    /// Drop a pending sign-in without polling again.
    pub fn abandon_sign_in(&mut self) -> Result<(), PipelineError> {
        self.ensure_awaiting_sign_in("cancel sign-in")?;
        self.session = None;
        tracing::info!("Sign-in abandoned");
        self.set_state(PipelineState::TasksReady {
            task_count: self.tasks.len(),
        });
        Ok(())
    }

    async fn submit(&mut self, token: &AccessToken) -> Vec<TaskSubmissionResult> {
        self.set_state(PipelineState::Submitting {
            task_count: self.tasks.len(),
        });

        let results = self
            .submitter
            .submit(&self.tasks, token, &self.list_id)
            .await;

        let created = results.iter().filter(|r| r.outcome.is_created()).count();
        let failed = results.len() - created;
        tracing::info!(created, failed, "Task submission finished");

        self.set_state(PipelineState::Done { created, failed });
        results
    }
}
