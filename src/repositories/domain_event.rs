//! # DomainEvent Repository
//!
//! Repository operations for the domain_events trigger queue: producers
//! append, the event consumer claims oldest-first and marks each row
//! consumed or failed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::domain_event::{ActiveModel, Column, Entity, EventKind, Model};

/// Repository for domain event queue operations
pub struct DomainEventRepository {
    db: DatabaseConnection,
}

impl DomainEventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append a durable trigger. Called from the producers' boundary; must
    /// never depend on the sync pipeline being healthy.
    pub async fn append(
        &self,
        kind: EventKind,
        reference_id: Uuid,
        payload: Option<JsonValue>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now().fixed_offset();

        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(kind.as_str().to_string()),
            reference_id: Set(reference_id),
            payload: Set(payload),
            status: Set("pending".to_string()),
            error: Set(None),
            created_at: Set(now),
            consumed_at: Set(None),
        };

        let result = row.insert(&self.db).await?;
        tracing::info!(
            event_id = %result.id,
            kind = %result.kind,
            reference_id = %reference_id,
            "Domain event appended"
        );
        Ok(result)
    }

    /// Oldest-first pending events, up to `limit`.
    pub async fn claim_pending(&self, limit: u64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Status.eq("pending"))
            .order_by_asc(Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
    }

    pub async fn mark_consumed(&self, id: Uuid) -> Result<(), DbErr> {
        self.finish(id, "consumed", None).await
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DbErr> {
        self.finish(id, "failed", Some(error.to_string())).await
    }

    async fn finish(&self, id: Uuid, status: &str, error: Option<String>) -> Result<(), DbErr> {
        let Some(existing) = Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(());
        };
        let mut active: ActiveModel = existing.into();
        active.status = Set(status.to_string());
        active.error = Set(error);
        active.consumed_at = Set(Some(Utc::now().fixed_offset()));
        active.update(&self.db).await?;
        Ok(())
    }
}
