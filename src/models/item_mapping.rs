//! ItemMapping entity model
//!
//! SeaORM entity for the item_mappings table, the persisted correspondence
//! between a hotel-side item and its QuickBooks ListID/FullName. Reference
//! data owned by the admin surface; a sale line for an unmapped item is a
//! hard precondition failure.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// ItemMapping entity linking a hotel item to a QuickBooks item
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "item_mappings")]
pub struct Model {
    /// Unique identifier for the mapping (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Hotel-side item identifier
    pub hotel_item_id: Uuid,

    /// Hotel-side item kind (e.g., "menu_item", "room_type", "stock_item")
    pub hotel_item_type: String,

    /// QuickBooks ListID of the mapped item
    pub qb_list_id: String,

    /// QuickBooks FullName of the mapped item
    pub qb_full_name: String,

    /// Whether inventory pulls should include this item
    pub sync_inventory: bool,

    /// Last on-hand quantity reported by QuickBooks for this item
    pub quantity_on_hand: Option<f64>,

    /// Last average cost reported by QuickBooks for this item
    pub average_cost: Option<f64>,

    /// Timestamp of the last applied inventory response
    pub quantity_updated_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the mapping was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the mapping was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
