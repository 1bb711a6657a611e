//! QbwcConfig entity model
//!
//! SeaORM entity for the qbwc_config table: a singleton row holding sync
//! flags, Web Connector credentials (password as a SHA-256 hex digest), the
//! last inventory sync watermark, and the observed connection status.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// QbwcConfig entity, one row per deployment
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "qbwc_config")]
pub struct Model {
    /// Row identifier (primary key; exactly one row is expected)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Master switch for the whole bridge
    pub sync_enabled: bool,

    /// Whether completed orders/bookings are forwarded as sales receipts
    pub sync_sales: bool,

    /// Whether inventory pulls from QuickBooks are allowed
    pub sync_inventory: bool,

    /// Web Connector username, stored in clear
    pub qbwc_username: String,

    /// Unsalted SHA-256 hex digest of the Web Connector password
    pub qbwc_password_hash: String,

    /// QuickBooks company file path advertised to the connector (optional)
    pub company_file: Option<String>,

    /// Stamped when an inventory query batch is queued
    pub last_inventory_sync: Option<DateTimeWithTimeZone>,

    /// Last observed connector state (never_connected, connected, auth_failed, error)
    pub connection_status: String,

    /// Timestamp when the row was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the row was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
