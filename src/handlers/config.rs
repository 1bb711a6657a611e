//! Admin endpoints for the bridge configuration row.
//!
//! The Web Connector password is write-only: updates take the plaintext and
//! store a digest, reads never return either.

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::credentials::hash_password;
use crate::error::{ApiError, ErrorType, validation_error};
use crate::models::qbwc_config;
use crate::repositories::{ConfigUpdate, QbwcConfigRepository};
use crate::server::AppState;

/// Serialized view of the configuration row, without credentials.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfigView {
    pub sync_enabled: bool,
    pub sync_sales: bool,
    pub sync_inventory: bool,
    pub qbwc_username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_file: Option<String>,
    #[schema(value_type = Option<String>)]
    pub last_inventory_sync: Option<DateTime<FixedOffset>>,
    pub connection_status: String,
}

impl From<qbwc_config::Model> for ConfigView {
    fn from(model: qbwc_config::Model) -> Self {
        Self {
            sync_enabled: model.sync_enabled,
            sync_sales: model.sync_sales,
            sync_inventory: model.sync_inventory,
            qbwc_username: model.qbwc_username,
            company_file: model.company_file,
            last_inventory_sync: model.last_inventory_sync,
            connection_status: model.connection_status,
        }
    }
}

/// Request body for creating or updating the configuration
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfigUpdateRequest {
    pub sync_enabled: bool,
    pub sync_sales: bool,
    pub sync_inventory: bool,
    pub qbwc_username: String,
    /// Plaintext Web Connector password; required on first configuration,
    /// optional afterwards (omit to keep the current one)
    #[serde(default)]
    pub qbwc_password: Option<String>,
    #[serde(default)]
    pub company_file: Option<String>,
}

/// Read the current configuration
#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Current configuration", body = ConfigView),
        (status = 404, description = "Bridge has never been configured"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "config",
    security(("bearer_auth" = []))
)]
pub async fn get_config(State(state): State<AppState>) -> Result<Json<ConfigView>, ApiError> {
    let config = QbwcConfigRepository::new(state.db.clone())
        .get()
        .await?
        .ok_or_else(|| ApiError::from(ErrorType::NotFound))?;
    Ok(Json(config.into()))
}

/// Create or replace the configuration
#[utoipa::path(
    put,
    path = "/api/config",
    request_body = ConfigUpdateRequest,
    responses(
        (status = 200, description = "Configuration stored", body = ConfigView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "config",
    security(("bearer_auth" = []))
)]
pub async fn put_config(
    State(state): State<AppState>,
    Json(request): Json<ConfigUpdateRequest>,
) -> Result<Json<ConfigView>, ApiError> {
    if request.qbwc_username.trim().is_empty() {
        return Err(validation_error(
            "Validation failed",
            json!({ "qbwc_username": "must not be empty" }),
        ));
    }

    let repo = QbwcConfigRepository::new(state.db.clone());
    let existing = repo.get().await?;

    let password_hash = match (&request.qbwc_password, &existing) {
        (Some(password), _) if !password.is_empty() => hash_password(password),
        (_, Some(current)) => current.qbwc_password_hash.clone(),
        (_, None) => {
            return Err(validation_error(
                "Validation failed",
                json!({ "qbwc_password": "required on first configuration" }),
            ));
        }
    };

    let updated = repo
        .upsert(ConfigUpdate {
            sync_enabled: request.sync_enabled,
            sync_sales: request.sync_sales,
            sync_inventory: request.sync_inventory,
            qbwc_username: request.qbwc_username,
            qbwc_password_hash: password_hash,
            company_file: request.company_file,
        })
        .await?;
    Ok(Json(updated.into()))
}
