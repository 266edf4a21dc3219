// API Server Binary Entry Point
//
// Purpose: Start the Axum API server over the recommendation pipeline
// Usage: cargo run --features api --bin api_server

use measure_scorer::challenges::recorder_from_config;
use measure_scorer::{
    create_router, Analyzer, AppState, MeasureCatalog, OpenAiClient, ReasoningService,
    RuleBasedService, ServiceConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "measure_scorer=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    // Configuration from environment variables
    let config = ServiceConfig::from_env()?;
    config.log_summary();

    let catalog = match &config.catalog_path {
        Some(path) => MeasureCatalog::load(path)?,
        None => {
            tracing::info!("Using built-in measure catalog");
            MeasureCatalog::builtin()
        }
    };

    // LLM when a key is configured, offline rules otherwise
    let service: Arc<dyn ReasoningService> = if config.reasoning.api_key.is_some() {
        Arc::new(OpenAiClient::new(&config.reasoning)?)
    } else {
        tracing::warn!("OPENAI_API_KEY not set, using rule-based recommendations");
        Arc::new(RuleBasedService::new())
    };
    tracing::info!("Reasoning service: {}", service.name());

    let analyzer = Arc::new(Analyzer::new(service, Arc::new(catalog)));
    let recorder = recorder_from_config(&config.challenges)?;
    let state = AppState::new(analyzer, recorder);

    // Create router with all endpoints and middleware
    let app = create_router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
