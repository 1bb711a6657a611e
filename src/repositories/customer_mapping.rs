//! # CustomerMapping Repository
//!
//! Repository operations for the customer_mappings table. The mapping is
//! optional reference data; `sync_customer` writes back the ListID QuickBooks
//! assigns when a customer is created remotely.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::models::customer_mapping::{ActiveModel, Column, Entity, Model};

/// Repository for customer mapping database operations
pub struct CustomerMappingRepository {
    db: DatabaseConnection,
}

impl CustomerMappingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_for_user(&self, hotel_user_id: Uuid) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::HotelUserId.eq(hotel_user_id))
            .one(&self.db)
            .await
    }

    /// Create or update the mapping for a hotel user.
    pub async fn upsert(
        &self,
        hotel_user_id: Uuid,
        qb_customer_list_id: &str,
    ) -> Result<Model, DbErr> {
        let now = Utc::now().fixed_offset();

        if let Some(existing) = self.find_for_user(hotel_user_id).await? {
            let mut active: ActiveModel = existing.into();
            active.qb_customer_list_id = Set(qb_customer_list_id.to_string());
            active.updated_at = Set(now);
            return active.update(&self.db).await;
        }

        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            hotel_user_id: Set(hotel_user_id),
            qb_customer_list_id: Set(qb_customer_list_id.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        row.insert(&self.db).await
    }

    pub async fn list_all(&self) -> Result<Vec<Model>, DbErr> {
        Entity::find().all(&self.db).await
    }
}
