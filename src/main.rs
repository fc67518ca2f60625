use api_rest::{AppState, router};
use careplan_core::{Collaborators, CoreConfig, SessionOrchestrator};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the care-plan service
///
/// Resolves configuration once from the environment, wires the orchestrator to the file store,
/// the guideline knowledge base and the reasoning/ranking services, and serves the REST API.
///
/// # Environment Variables
/// - `CAREPLAN_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CAREPLAN_DATA_DIR`: Directory for session snapshots (default: "careplan_data")
/// - `CAREPLAN_REASONING_URL`, `CAREPLAN_RANKING_URL`: upstream endpoints (required)
/// - `CAREPLAN_UPSTREAM_TIMEOUT_MS`, `CAREPLAN_RETRY_BACKOFF_MS`, `CAREPLAN_MAX_ROUNDS`
/// - `CAREPLAN_KNOWLEDGE_FILE`: optional guideline YAML replacing the built-in guidelines
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration is invalid or an upstream URL is missing,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("careplan_run=info".parse()?)
                .add_directive("careplan_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    let rest_addr = std::env::var("CAREPLAN_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let orchestrator = SessionOrchestrator::new(&cfg, Collaborators::from_config(&cfg)?);
    let app = router(AppState {
        orchestrator: Arc::new(orchestrator),
    });

    tracing::info!(
        "++ Starting care plan REST on {} (data dir {})",
        rest_addr,
        cfg.data_dir().display()
    );

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
