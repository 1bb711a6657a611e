//! Admin endpoints for the sync log, manual triggers, and the domain event
//! intake.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, validation_error};
use crate::models::domain_event::EventKind;
use crate::models::sync_log::{self, SyncStatus};
use crate::repositories::{DomainEventRepository, SyncLogRepository, SyncStatistics};
use crate::server::AppState;

/// Serialized view of a sync log entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncLogEntryView {
    pub id: Uuid,
    pub sync_type: String,
    pub direction: String,
    pub reference_type: String,
    pub reference_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbxml_request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbxml_response: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qb_transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retry_count: i32,
    #[schema(value_type = String)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<FixedOffset>,
    #[schema(value_type = Option<String>)]
    pub synced_at: Option<DateTime<FixedOffset>>,
}

impl From<sync_log::Model> for SyncLogEntryView {
    fn from(model: sync_log::Model) -> Self {
        Self {
            id: model.id,
            sync_type: model.sync_type,
            direction: model.direction,
            reference_type: model.reference_type,
            reference_id: model.reference_id,
            qbxml_request: model.qbxml_request,
            qbxml_response: model.qbxml_response,
            status: model.status,
            qb_transaction_id: model.qb_transaction_id,
            error_message: model.error_message,
            retry_count: model.retry_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
            synced_at: model.synced_at,
        }
    }
}

/// Query parameters for sync log listing
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListLogQuery {
    /// Filter by status (pending, processing, completed, failed)
    pub status: Option<String>,
    /// Page size, capped at 200 (default: 50)
    pub limit: Option<u64>,
    /// Offset into the newest-first ordering (default: 0)
    pub offset: Option<u64>,
}

/// List sync log entries, newest first
#[utoipa::path(
    get,
    path = "/api/sync/log",
    params(ListLogQuery),
    responses(
        (status = 200, description = "Sync log entries", body = [SyncLogEntryView]),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sync",
    security(("bearer_auth" = []))
)]
pub async fn list_sync_log(
    State(state): State<AppState>,
    Query(query): Query<ListLogQuery>,
) -> Result<Json<Vec<SyncLogEntryView>>, ApiError> {
    let status = match &query.status {
        Some(raw) => Some(SyncStatus::parse(raw).ok_or_else(|| {
            validation_error(
                "Invalid status filter",
                json!({ "status": "must be one of pending, processing, completed, failed" }),
            )
        })?),
        None => None,
    };

    let limit = query.limit.unwrap_or(50).min(200);
    let offset = query.offset.unwrap_or(0);

    let entries = SyncLogRepository::new(state.db.clone())
        .list(status, limit, offset)
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Aggregate sync counts for the dashboard
#[utoipa::path(
    get,
    path = "/api/sync/statistics",
    responses(
        (status = 200, description = "Sync statistics", body = SyncStatistics),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sync",
    security(("bearer_auth" = []))
)]
pub async fn sync_statistics(
    State(state): State<AppState>,
) -> Result<Json<SyncStatistics>, ApiError> {
    Ok(Json(state.orchestrator.get_sync_statistics().await?))
}

/// Pending entries awaiting the next polling cycle, oldest first
#[utoipa::path(
    get,
    path = "/api/sync/pending",
    responses(
        (status = 200, description = "Pending sync entries", body = [SyncLogEntryView]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sync",
    security(("bearer_auth" = []))
)]
pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<SyncLogEntryView>>, ApiError> {
    let batch = state.orchestrator.settings().pending_batch_size;
    let entries = state.orchestrator.get_pending_requests(batch).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Reset a failed entry to pending for another polling cycle
#[utoipa::path(
    post,
    path = "/api/sync/log/{id}/retry",
    params(("id" = Uuid, Path, description = "Sync log entry identifier")),
    responses(
        (status = 200, description = "Entry reset to pending", body = SyncLogEntryView),
        (status = 404, description = "Entry not found"),
        (status = 409, description = "Entry is not failed or its retry limit is reached"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sync",
    security(("bearer_auth" = []))
)]
pub async fn retry_sync(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SyncLogEntryView>, ApiError> {
    let entry = state.orchestrator.retry_failed_sync(id).await?;
    Ok(Json(entry.into()))
}

/// Queue inventory queries for every mapping flagged for inventory sync
#[utoipa::path(
    post,
    path = "/api/sync/inventory/pull",
    responses(
        (status = 202, description = "Inventory queries queued"),
        (status = 409, description = "Inventory sync is disabled"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sync",
    security(("bearer_auth" = []))
)]
pub async fn trigger_inventory_pull(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let queued = state.orchestrator.sync_inventory_from_qb().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "queued": queued.len() })),
    ))
}

/// Request body for pushing an absolute on-hand quantity to QuickBooks
#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustmentRequest {
    pub hotel_item_id: Uuid,
    pub hotel_item_type: String,
    pub new_quantity: f64,
    #[serde(default)]
    pub unit_cost: Option<f64>,
}

/// Queue an inventory adjustment for one mapped item
#[utoipa::path(
    post,
    path = "/api/sync/inventory/adjustments",
    request_body = InventoryAdjustmentRequest,
    responses(
        (status = 202, description = "Adjustment queued", body = SyncLogEntryView),
        (status = 409, description = "Inventory sync is disabled"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sync",
    security(("bearer_auth" = []))
)]
pub async fn create_inventory_adjustment(
    State(state): State<AppState>,
    Json(request): Json<InventoryAdjustmentRequest>,
) -> Result<(StatusCode, Json<SyncLogEntryView>), ApiError> {
    let entry = state
        .orchestrator
        .sync_inventory_adjustment(
            request.hotel_item_id,
            &request.hotel_item_type,
            request.new_quantity,
            request.unit_cost,
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(entry.into())))
}

/// Request body for queueing a customer sync
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerSyncRequest {
    pub user_id: Uuid,
}

/// Queue a CustomerAdd for a hotel user
#[utoipa::path(
    post,
    path = "/api/sync/customers",
    request_body = CustomerSyncRequest,
    responses(
        (status = 202, description = "Customer sync queued", body = SyncLogEntryView),
        (status = 404, description = "No profile snapshot for the user"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sync",
    security(("bearer_auth" = []))
)]
pub async fn sync_customer(
    State(state): State<AppState>,
    Json(request): Json<CustomerSyncRequest>,
) -> Result<(StatusCode, Json<SyncLogEntryView>), ApiError> {
    let entry = state.orchestrator.sync_customer(request.user_id).await?;
    Ok((StatusCode::ACCEPTED, Json(entry.into())))
}

/// Request body for appending a domain event
#[derive(Debug, Deserialize, ToSchema)]
pub struct AppendEventRequest {
    /// Event kind (order_completed or booking_checked_out)
    pub kind: String,
    pub reference_id: Uuid,
    /// Snapshot of the referenced entity as emitted by the domain service
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Append a durable domain event for the background consumer
#[utoipa::path(
    post,
    path = "/api/events",
    request_body = AppendEventRequest,
    responses(
        (status = 202, description = "Event appended"),
        (status = 400, description = "Unknown event kind"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "events",
    security(("bearer_auth" = []))
)]
pub async fn append_event(
    State(state): State<AppState>,
    Json(request): Json<AppendEventRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let kind = EventKind::parse(&request.kind).ok_or_else(|| {
        validation_error(
            "Unknown event kind",
            json!({ "kind": "must be order_completed or booking_checked_out" }),
        )
    })?;

    let event = DomainEventRepository::new(state.db.clone())
        .append(kind, request.reference_id, request.payload)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": event.id }))))
}
