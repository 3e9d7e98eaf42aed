//! Pareto To Do - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the goal-to-task pipeline.

use pareto_todo::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pareto_todo=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        model = %config.completion.model,
        max_tokens = config.completion.max_tokens,
        api_key_configured = config.xai_api_key.is_some(),
        list_configured = config.todo_list_id.is_some(),
        "Loaded configuration"
    );

    info!("Starting server on {}:{}", config.host, config.port);
    api::serve(config).await?;

    Ok(())
}
