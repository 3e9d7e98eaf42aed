//! Pareto run endpoints.

use std::future::Future;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tokio_util::sync::CancellationToken;

use crate::oauth::AuthError;
use crate::pipeline::{
    GenerationSettings, PipelineError, PipelineOrchestrator, PipelineState, SignInPrompt,
    SignInStatus,
};

use super::routes::{AppState, RunHandle};
use super::types::{
    ContinueRequest, ContinueResponse, GenerateRequest, GenerateResponse, StateResponse,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Map a pipeline error to a status code and message.
pub(crate) fn error_response(err: PipelineError) -> (StatusCode, String) {
    let status = match &err {
        PipelineError::EmptyGoal | PipelineError::NothingToSubmit => StatusCode::BAD_REQUEST,
        PipelineError::InvalidTransition { .. } => StatusCode::CONFLICT,
        PipelineError::Completion(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Auth(auth) => match auth {
            AuthError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Denied { .. } => StatusCode::FORBIDDEN,
            AuthError::Init(_) | AuthError::Poll(_) => StatusCode::BAD_GATEWAY,
            AuthError::Cancelled => StatusCode::CONFLICT,
        },
    };
    (status, err.to_string())
}

fn no_run() -> (StatusCode, String) {
    (StatusCode::CONFLICT, "No run in progress".to_string())
}

/// Request value, else configured fallback, else `None`.
fn credential(requested: Option<String>, fallback: &Option<String>) -> Option<String> {
    requested
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.clone())
}

/// Run `job` on its own task so a dropped request can't stop it halfway and
/// leave the run between states.
async fn detached<T, F>(job: F) -> Result<T, (StatusCode, String)>
where
    F: Future<Output = Result<T, PipelineError>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(job).await {
        Ok(result) => result.map_err(error_response),
        Err(e) => {
            tracing::error!("Pipeline task failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Pipeline task failed".to_string(),
            ))
        }
    }
}

async fn require_run(state: &AppState) -> Result<RunHandle, (StatusCode, String)> {
    state.current_run().await.ok_or_else(no_run)
}

/// Start a new run and generate its tasks. Replaces any previous run.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<GenerateResponse> {
    if req.goal.trim().is_empty() {
        return Err(error_response(PipelineError::EmptyGoal));
    }
    let api_key = credential(req.api_key, &state.config.xai_api_key).ok_or((
        StatusCode::BAD_REQUEST,
        "Missing completion API key".to_string(),
    ))?;
    let list_id = credential(req.list_id, &state.config.todo_list_id).ok_or((
        StatusCode::BAD_REQUEST,
        "Missing To Do list id".to_string(),
    ))?;

    let config = &state.config;
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(config.completion_client(state.http.clone(), api_key)),
        config.authenticator(state.http.clone()),
        config.submitter(state.http.clone()),
        GenerationSettings {
            model: config.completion.model.clone(),
            max_tokens: config.completion.max_tokens,
        },
        list_id,
    );
    let run = RunHandle::new(orchestrator);
    tracing::info!(run_id = %run.id, "Starting Pareto run");
    state.replace_run(run.clone()).await;

    let run_id = run.id;
    let orchestrator = Arc::clone(&run.orchestrator);
    let response = detached(async move {
        let mut orchestrator = orchestrator.lock().await;
        let tasks = orchestrator.generate(&req.goal).await?.to_vec();
        let goal = orchestrator.goal().unwrap_or_default().to_string();
        let completion = orchestrator.completion().unwrap_or_default().to_string();
        Ok(GenerateResponse {
            run_id,
            goal,
            completion,
            tasks,
            state: orchestrator.state(),
        })
    })
    .await?;
    Ok(Json(response))
}

/// Begin device-code sign-in for the generated tasks.
pub async fn create(State(state): State<Arc<AppState>>) -> ApiResult<SignInPrompt> {
    let run = require_run(&state).await?;
    let orchestrator = Arc::clone(&run.orchestrator);
    let prompt = detached(async move {
        let mut orchestrator = orchestrator.lock().await;
        let prompt = orchestrator.begin_authentication().await?;
        Ok(prompt)
    })
    .await?;
    Ok(Json(prompt))
}

/// The user says they signed in: check once, or wait until sign-in ends.
///
/// A waiting request that goes away doesn't stop the wait; `cancel` does.
pub async fn continue_sign_in(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ContinueRequest>>,
) -> ApiResult<ContinueResponse> {
    let run = require_run(&state).await?;
    let Json(req) = body.unwrap_or_default();
    let orchestrator = Arc::clone(&run.orchestrator);

    if req.wait {
        let cancel = CancellationToken::new();
        *run.sign_in_cancel.lock().await = cancel.clone();

        let results = detached(async move {
            let mut orchestrator = orchestrator.lock().await;
            let results = orchestrator.wait_for_sign_in(&cancel).await?;
            Ok(results)
        })
        .await?;
        return Ok(Json(ContinueResponse::done(results)));
    }

    let status = detached(async move {
        let mut orchestrator = orchestrator.lock().await;
        let status = orchestrator.poll_sign_in().await?;
        Ok(status)
    })
    .await?;
    Ok(Json(match status {
        SignInStatus::Pending { retry_after } => ContinueResponse::Pending {
            retry_after_secs: retry_after.as_secs(),
        },
        SignInStatus::Completed(results) => ContinueResponse::done(results),
    }))
}

/// Abandon the pending sign-in. The tasks stay ready for another attempt.
pub async fn cancel(State(state): State<Arc<AppState>>) -> ApiResult<StateResponse> {
    let run = require_run(&state).await?;
    if !matches!(run.state(), PipelineState::AwaitingUserSignIn { .. }) {
        return Err((
            StatusCode::CONFLICT,
            format!("Cannot cancel sign-in while {}", run.state().name()),
        ));
    }

    run.cancel_sign_in().await;

    let mut orchestrator = run.orchestrator.lock().await;
    // A cancelled wait has already gone back to TasksReady.
    if matches!(orchestrator.state(), PipelineState::AwaitingUserSignIn { .. }) {
        orchestrator.abandon_sign_in().map_err(error_response)?;
    }

    Ok(Json(StateResponse {
        run_id: Some(run.id),
        state: orchestrator.state(),
    }))
}

/// Current run state. Never waits on a run in progress.
pub async fn state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let response = match state.current_run().await {
        Some(run) => StateResponse {
            run_id: Some(run.id),
            state: run.state(),
        },
        None => StateResponse {
            run_id: None,
            state: PipelineState::Idle,
        },
    };
    Json(response)
}
