//! CustomerMapping entity model
//!
//! SeaORM entity for the customer_mappings table. Optional reference data:
//! sales for an unmapped hotel user fall back to the generic walk-in customer.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// CustomerMapping entity linking a hotel user to a QuickBooks customer
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "customer_mappings")]
pub struct Model {
    /// Unique identifier for the mapping (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Hotel-side user identifier
    pub hotel_user_id: Uuid,

    /// QuickBooks ListID of the mapped customer
    pub qb_customer_list_id: String,

    /// Timestamp when the mapping was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the mapping was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
