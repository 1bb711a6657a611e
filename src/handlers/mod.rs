//! # API Handlers
//!
//! HTTP endpoint handlers: the SOAP endpoint the Web Connector polls and the
//! operator-facing admin API.

use axum::extract::State;
use axum::response::Json;

use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod config;
pub mod mappings;
pub mod qbwc;
pub mod sync;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Readiness probe covering the database connection
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Database unavailable")
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    crate::db::health_check(&state.db).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
