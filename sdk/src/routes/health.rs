use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};

pub fn router() -> Router {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness of the provider process
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Provider is serving procedures", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
