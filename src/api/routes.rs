//! Router, shared state, and server lifecycle.

use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::pipeline::{PipelineOrchestrator, PipelineState};

use super::pareto;
use super::types::HealthResponse;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Outbound client shared by every run
    pub http: reqwest::Client,
    /// The single active run, replaced by each generate call
    pub run: RwLock<Option<RunHandle>>,
}

/// One goal-to-task run.
#[derive(Clone)]
pub struct RunHandle {
    pub id: Uuid,
    pub orchestrator: Arc<Mutex<PipelineOrchestrator>>,
    /// State updates, readable while a long operation holds the orchestrator
    pub progress: watch::Receiver<PipelineState>,
    /// Cancels the sign-in wait in progress, if any
    pub sign_in_cancel: Arc<Mutex<CancellationToken>>,
}

impl RunHandle {
    pub fn new(orchestrator: PipelineOrchestrator) -> Self {
        let progress = orchestrator.subscribe();
        Self {
            id: Uuid::new_v4(),
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            progress,
            sign_in_cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.progress.borrow().clone()
    }

    /// Stop any sign-in wait on this run.
    pub async fn cancel_sign_in(&self) {
        self.sign_in_cancel.lock().await.cancel();
    }
}

impl AppState {
    pub fn new(config: Config, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            run: RwLock::new(None),
        }
    }

    pub async fn current_run(&self) -> Option<RunHandle> {
        self.run.read().await.clone()
    }

    /// Install `run` as the active run, cancelling the previous one's sign-in.
    pub async fn replace_run(&self, run: RunHandle) {
        let previous = self.run.write().await.replace(run);
        if let Some(previous) = previous {
            tracing::info!(
                run_id = %previous.id,
                finished = previous.state().is_terminal(),
                "Replacing previous run"
            );
            previous.cancel_sign_in().await;
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/pareto/generate", post(pareto::generate))
        .route("/api/pareto/create", post(pareto::create))
        .route("/api/pareto/continue", post(pareto::continue_sign_in))
        .route("/api/pareto/cancel", post(pareto::cancel))
        .route("/api/pareto/state", get(pareto::state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let http = config.http_client()?;
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, http));
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Setup graceful shutdown on SIGTERM/SIGINT
    let shutdown_state = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown_state).await;
        })
        .await?;

    Ok(())
}

/// Wait for a shutdown signal and stop any sign-in wait.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");

    if let Some(run) = state.current_run().await {
        run.cancel_sign_in().await;
    }

    tracing::info!("Graceful shutdown complete");
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
