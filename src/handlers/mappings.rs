//! Admin endpoints for item and customer mappings.
//!
//! Mappings are reference data: they tie hotel catalog items and users to the
//! QuickBooks ListIDs that QBXML requires.

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, validation_error};
use crate::models::{customer_mapping, item_mapping};
use crate::repositories::{CustomerMappingRepository, ItemMappingRepository};
use crate::server::AppState;

/// Serialized view of an item mapping, including cached inventory figures.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemMappingView {
    pub id: Uuid,
    pub hotel_item_id: Uuid,
    pub hotel_item_type: String,
    pub qb_list_id: String,
    pub qb_full_name: String,
    pub sync_inventory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_on_hand: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,
    #[schema(value_type = Option<String>)]
    pub quantity_updated_at: Option<DateTime<FixedOffset>>,
}

impl From<item_mapping::Model> for ItemMappingView {
    fn from(model: item_mapping::Model) -> Self {
        Self {
            id: model.id,
            hotel_item_id: model.hotel_item_id,
            hotel_item_type: model.hotel_item_type,
            qb_list_id: model.qb_list_id,
            qb_full_name: model.qb_full_name,
            sync_inventory: model.sync_inventory,
            quantity_on_hand: model.quantity_on_hand,
            average_cost: model.average_cost,
            quantity_updated_at: model.quantity_updated_at,
        }
    }
}

/// Request body for creating or updating an item mapping
#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemMappingUpsertRequest {
    pub hotel_item_id: Uuid,
    pub hotel_item_type: String,
    pub qb_list_id: String,
    pub qb_full_name: String,
    #[serde(default)]
    pub sync_inventory: bool,
}

/// List all item mappings
#[utoipa::path(
    get,
    path = "/api/mappings/items",
    responses(
        (status = 200, description = "Item mappings", body = [ItemMappingView]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "mappings",
    security(("bearer_auth" = []))
)]
pub async fn list_item_mappings(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemMappingView>>, ApiError> {
    let mappings = ItemMappingRepository::new(state.db.clone())
        .list_all()
        .await?;
    Ok(Json(mappings.into_iter().map(Into::into).collect()))
}

/// Create or update an item mapping
#[utoipa::path(
    post,
    path = "/api/mappings/items",
    request_body = ItemMappingUpsertRequest,
    responses(
        (status = 200, description = "Mapping stored", body = ItemMappingView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "mappings",
    security(("bearer_auth" = []))
)]
pub async fn upsert_item_mapping(
    State(state): State<AppState>,
    Json(request): Json<ItemMappingUpsertRequest>,
) -> Result<Json<ItemMappingView>, ApiError> {
    if request.qb_list_id.trim().is_empty() || request.qb_full_name.trim().is_empty() {
        return Err(validation_error(
            "Validation failed",
            json!({ "qb_list_id": "must not be empty", "qb_full_name": "must not be empty" }),
        ));
    }

    let mapping = ItemMappingRepository::new(state.db.clone())
        .upsert(
            request.hotel_item_id,
            &request.hotel_item_type,
            &request.qb_list_id,
            &request.qb_full_name,
            request.sync_inventory,
        )
        .await?;
    Ok(Json(mapping.into()))
}

/// Serialized view of a customer mapping.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerMappingView {
    pub id: Uuid,
    pub hotel_user_id: Uuid,
    pub qb_customer_list_id: String,
}

impl From<customer_mapping::Model> for CustomerMappingView {
    fn from(model: customer_mapping::Model) -> Self {
        Self {
            id: model.id,
            hotel_user_id: model.hotel_user_id,
            qb_customer_list_id: model.qb_customer_list_id,
        }
    }
}

/// Request body for creating or updating a customer mapping
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerMappingUpsertRequest {
    pub hotel_user_id: Uuid,
    pub qb_customer_list_id: String,
}

/// List all customer mappings
#[utoipa::path(
    get,
    path = "/api/mappings/customers",
    responses(
        (status = 200, description = "Customer mappings", body = [CustomerMappingView]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "mappings",
    security(("bearer_auth" = []))
)]
pub async fn list_customer_mappings(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerMappingView>>, ApiError> {
    let mappings = CustomerMappingRepository::new(state.db.clone())
        .list_all()
        .await?;
    Ok(Json(mappings.into_iter().map(Into::into).collect()))
}

/// Create or update a customer mapping
#[utoipa::path(
    post,
    path = "/api/mappings/customers",
    request_body = CustomerMappingUpsertRequest,
    responses(
        (status = 200, description = "Mapping stored", body = CustomerMappingView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "mappings",
    security(("bearer_auth" = []))
)]
pub async fn upsert_customer_mapping(
    State(state): State<AppState>,
    Json(request): Json<CustomerMappingUpsertRequest>,
) -> Result<Json<CustomerMappingView>, ApiError> {
    if request.qb_customer_list_id.trim().is_empty() {
        return Err(validation_error(
            "Validation failed",
            json!({ "qb_customer_list_id": "must not be empty" }),
        ));
    }

    let mapping = CustomerMappingRepository::new(state.db.clone())
        .upsert(request.hotel_user_id, &request.qb_customer_list_id)
        .await?;
    Ok(Json(mapping.into()))
}
