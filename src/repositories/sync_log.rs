//! # SyncLog Repository
//!
//! Repository operations for the sync_log table: queueing entries, feeding
//! the Web Connector drain, and aggregating statistics for the dashboard.
//! Status transitions on existing rows happen in the orchestrator so they can
//! share a transaction with their side effects.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::sync_log::{
    ActiveModel, Column, Direction, Entity, Model, ReferenceType, SyncStatus, SyncType,
};

/// Parameters for queueing a new sync log entry.
#[derive(Debug, Clone)]
pub struct NewSyncLogEntry {
    pub sync_type: SyncType,
    pub direction: Direction,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    /// Built QBXML body; `None` when the build itself failed.
    pub qbxml_request: Option<String>,
    /// Initial status: `Pending` for queued work, `Failed` for a build
    /// failure recorded for visibility.
    pub status: SyncStatus,
    pub error_message: Option<String>,
}

/// Aggregate counts per status plus the most recent successful sync.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncStatistics {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    /// `synced_at` of the most recently completed entry
    #[schema(value_type = Option<String>, example = "2026-08-20T12:00:00Z")]
    pub last_successful_sync: Option<chrono::DateTime<chrono::FixedOffset>>,
}

/// Repository for sync log database operations
pub struct SyncLogRepository {
    db: DatabaseConnection,
}

impl SyncLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append a new entry to the log.
    pub async fn create(&self, entry: NewSyncLogEntry) -> Result<Model, DbErr> {
        let now = Utc::now().fixed_offset();

        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            sync_type: Set(entry.sync_type.as_str().to_string()),
            direction: Set(entry.direction.as_str().to_string()),
            reference_type: Set(entry.reference_type.as_str().to_string()),
            reference_id: Set(entry.reference_id),
            qbxml_request: Set(entry.qbxml_request),
            qbxml_response: Set(None),
            status: Set(entry.status.as_str().to_string()),
            qb_transaction_id: Set(None),
            error_message: Set(entry.error_message),
            retry_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            synced_at: Set(None),
        };

        let result = row.insert(&self.db).await?;

        tracing::info!(
            log_id = %result.id,
            sync_type = %result.sync_type,
            reference_id = %result.reference_id,
            status = %result.status,
            "Sync log entry queued"
        );

        Ok(result)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(&self.db).await
    }

    /// Oldest-first pending entries, the sole feed for the protocol handler.
    pub async fn list_pending(&self, limit: u64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Status.eq(SyncStatus::Pending.as_str()))
            .order_by_asc(Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
    }

    /// List entries for the admin dashboard with optional status filtering.
    pub async fn list(
        &self,
        status: Option<SyncStatus>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find().order_by_desc(Column::CreatedAt);

        if let Some(status_filter) = status {
            query = query.filter(Column::Status.eq(status_filter.as_str()));
        }

        query.offset(offset).limit(limit).all(&self.db).await
    }

    pub async fn statistics(&self) -> Result<SyncStatistics, DbErr> {
        let count_for = |status: SyncStatus| {
            Entity::find()
                .filter(Column::Status.eq(status.as_str()))
                .count(&self.db)
        };

        let pending = count_for(SyncStatus::Pending).await?;
        let processing = count_for(SyncStatus::Processing).await?;
        let completed = count_for(SyncStatus::Completed).await?;
        let failed = count_for(SyncStatus::Failed).await?;

        let last_successful_sync = Entity::find()
            .filter(Column::Status.eq(SyncStatus::Completed.as_str()))
            .order_by_desc(Column::SyncedAt)
            .one(&self.db)
            .await?
            .and_then(|row| row.synced_at);

        Ok(SyncStatistics {
            pending,
            processing,
            completed,
            failed,
            last_successful_sync,
        })
    }
}
