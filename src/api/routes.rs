use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::{
    cors::CorsLayer,
    services::ServeFile,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(handlers::health_check))
        // Prediction API
        .route("/api/predict/", post(handlers::predict))
        .route("/api/compare/", post(handlers::compare_models))
        .route("/api/debug", get(handlers::debug_info))
        // Static pages, served verbatim
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/results", ServeFile::new(static_dir.join("results.html")))
        .route_service("/compare", ServeFile::new(static_dir.join("compare.html")))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
