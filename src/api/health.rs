/// Health and metrics endpoints
use crate::{context::AppContext, metrics};
use axum::{response::Json, routing::get, Router};
use serde_json::json;

/// Build health routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus text-format metrics
async fn metrics_endpoint() -> String {
    metrics::gather()
}
