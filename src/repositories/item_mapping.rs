//! # ItemMapping Repository
//!
//! Repository operations for the item_mappings table. Mappings are reference
//! data administered outside the sync flow; the bridge reads them when
//! building QBXML and writes back cached inventory figures from pulls.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::models::item_mapping::{ActiveModel, Column, Entity, Model};

/// Repository for item mapping database operations
pub struct ItemMappingRepository {
    db: DatabaseConnection,
}

impl ItemMappingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Look up the mapping for a hotel item. `None` means the item cannot
    /// appear in QBXML yet.
    pub async fn find_for_item(
        &self,
        hotel_item_id: Uuid,
        hotel_item_type: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::HotelItemId.eq(hotel_item_id))
            .filter(Column::HotelItemType.eq(hotel_item_type))
            .one(&self.db)
            .await
    }

    pub async fn find_by_list_id(&self, qb_list_id: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::QbListId.eq(qb_list_id))
            .one(&self.db)
            .await
    }

    /// All mappings flagged for inventory sync, the source set for
    /// `sync_inventory_from_qb`.
    pub async fn list_inventory_synced(&self) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SyncInventory.eq(true))
            .all(&self.db)
            .await
    }

    /// Create or update the mapping for a hotel item (admin surface).
    pub async fn upsert(
        &self,
        hotel_item_id: Uuid,
        hotel_item_type: &str,
        qb_list_id: &str,
        qb_full_name: &str,
        sync_inventory: bool,
    ) -> Result<Model, DbErr> {
        let now = Utc::now().fixed_offset();

        if let Some(existing) = self.find_for_item(hotel_item_id, hotel_item_type).await? {
            let mut active: ActiveModel = existing.into();
            active.qb_list_id = Set(qb_list_id.to_string());
            active.qb_full_name = Set(qb_full_name.to_string());
            active.sync_inventory = Set(sync_inventory);
            active.updated_at = Set(now);
            return active.update(&self.db).await;
        }

        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            hotel_item_id: Set(hotel_item_id),
            hotel_item_type: Set(hotel_item_type.to_string()),
            qb_list_id: Set(qb_list_id.to_string()),
            qb_full_name: Set(qb_full_name.to_string()),
            sync_inventory: Set(sync_inventory),
            quantity_on_hand: Set(None),
            average_cost: Set(None),
            quantity_updated_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        row.insert(&self.db).await
    }

    pub async fn list_all(&self) -> Result<Vec<Model>, DbErr> {
        Entity::find().all(&self.db).await
    }
}
