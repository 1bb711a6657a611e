//! # QbwcConfig Repository
//!
//! Repository operations for the singleton qbwc_config row: credentials,
//! sync flags, the inventory sync watermark, and the observed connector
//! state.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use uuid::Uuid;

use crate::models::qbwc_config::{ActiveModel, Entity, Model};

/// Parameters for creating or replacing the configuration row.
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub sync_enabled: bool,
    pub sync_sales: bool,
    pub sync_inventory: bool,
    pub qbwc_username: String,
    /// Already-hashed password digest; hashing happens at the admin boundary.
    pub qbwc_password_hash: String,
    pub company_file: Option<String>,
}

/// Repository for connector configuration operations
pub struct QbwcConfigRepository {
    db: DatabaseConnection,
}

impl QbwcConfigRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The singleton row, or `None` when the bridge was never configured.
    pub async fn get(&self) -> Result<Option<Model>, DbErr> {
        Entity::find().one(&self.db).await
    }

    /// Create or replace the configuration row.
    pub async fn upsert(&self, update: ConfigUpdate) -> Result<Model, DbErr> {
        let now = Utc::now().fixed_offset();

        if let Some(existing) = self.get().await? {
            let mut active: ActiveModel = existing.into();
            active.sync_enabled = Set(update.sync_enabled);
            active.sync_sales = Set(update.sync_sales);
            active.sync_inventory = Set(update.sync_inventory);
            active.qbwc_username = Set(update.qbwc_username);
            active.qbwc_password_hash = Set(update.qbwc_password_hash);
            active.company_file = Set(update.company_file);
            active.updated_at = Set(now);
            return active.update(&self.db).await;
        }

        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            sync_enabled: Set(update.sync_enabled),
            sync_sales: Set(update.sync_sales),
            sync_inventory: Set(update.sync_inventory),
            qbwc_username: Set(update.qbwc_username),
            qbwc_password_hash: Set(update.qbwc_password_hash),
            company_file: Set(update.company_file),
            last_inventory_sync: Set(None),
            connection_status: Set("never_connected".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        row.insert(&self.db).await
    }

    /// Stamp the inventory watermark; called when a query batch is queued.
    pub async fn touch_last_inventory_sync(
        &self,
        at: DateTimeWithTimeZone,
    ) -> Result<(), DbErr> {
        if let Some(existing) = self.get().await? {
            let mut active: ActiveModel = existing.into();
            active.last_inventory_sync = Set(Some(at));
            active.updated_at = Set(Utc::now().fixed_offset());
            active.update(&self.db).await?;
        }
        Ok(())
    }

    /// Record the connector state observed at the protocol boundary.
    pub async fn set_connection_status(&self, status: &str) -> Result<(), DbErr> {
        if let Some(existing) = self.get().await? {
            if existing.connection_status == status {
                return Ok(());
            }
            let mut active: ActiveModel = existing.into();
            active.connection_status = Set(status.to_string());
            active.updated_at = Set(Utc::now().fixed_offset());
            active.update(&self.db).await?;
        }
        Ok(())
    }
}
