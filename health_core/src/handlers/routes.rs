//! Route table for the reporting endpoint

use super::health::{handle_category_health, handle_health};
use crate::AppState;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/health/:category", get(handle_category_health))
}

async fn handle_root(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "app": state.app_name,
        "version": state.version,
        "endpoints": {
            "health": "/health",
            "general": "/health/general",
            "liveness": "/health/live",
            "readiness": "/health/ready"
        }
    }))
}
