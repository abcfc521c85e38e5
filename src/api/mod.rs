pub mod data;
pub mod models;

// Re-exports
pub use models::*;

use axum::{routing::get, Json, Router};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub async fn root_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Location of Product API!".to_string(),
        routes: vec!["/data".to_string(), "/data/:key".to_string()],
    })
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Full application router with CORS and request tracing
pub fn router(state: AppState, cors_max_age: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(cors_max_age);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(data::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
