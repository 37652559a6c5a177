use failsight::{
    api::{build_router, AppState},
    artifacts::ArtifactStore,
    config::Config,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "failsight=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    tracing::info!("Starting failsight v{}", env!("CARGO_PKG_VERSION"));

    // Load pre-trained artifacts; the service never answers with a null model.
    let store = ArtifactStore::new(&config.artifacts.dir);
    let artifacts = match store.load() {
        Ok(artifacts) => artifacts,
        Err(e) => {
            tracing::error!(
                error = %e,
                dir = %config.artifacts.dir.display(),
                "FATAL: model artifacts could not be loaded; run failsight-train first"
            );
            std::process::exit(1);
        }
    };
    tracing::info!(
        feature_count = artifacts.feature_count(),
        "artifacts loaded"
    );

    // Create application state for the HTTP API
    let app_state = AppState::new(Arc::new(artifacts));

    // Build HTTP router
    let app = build_router(app_state, &config.server.static_dir);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Prediction API: http://{}/api/predict/", http_addr);
    tracing::info!("   Comparison API: http://{}/api/compare/", http_addr);

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
