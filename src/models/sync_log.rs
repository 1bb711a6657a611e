//! SyncLog entity model
//!
//! SeaORM entity for the sync_log table: the durable journal of every
//! QuickBooks sync attempt and the pending queue drained by Web Connector
//! polling cycles.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// SyncLog entity representing one sync attempt against QuickBooks
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_log")]
pub struct Model {
    /// Unique identifier for the log entry (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// What is being synced (one of: sale, inventory_pull, inventory_push, customer_sync)
    pub sync_type: String,

    /// Direction of the exchange (to_qb or from_qb)
    pub direction: String,

    /// Kind of domain entity this entry refers to (order, booking, inventory_item, customer)
    pub reference_type: String,

    /// Identifier of the referenced domain entity
    pub reference_id: Uuid,

    /// Outbound QBXML request body; absent when the build itself failed
    pub qbxml_request: Option<String>,

    /// Raw QBXML response as received from QuickBooks
    pub qbxml_response: Option<String>,

    /// Current status (pending, processing, completed, failed)
    pub status: String,

    /// QuickBooks-assigned transaction identifier (TxnID) on success
    pub qb_transaction_id: Option<String>,

    /// Error detail when the entry failed
    pub error_message: Option<String>,

    /// Number of operator-triggered retries so far
    pub retry_count: i32,

    /// Timestamp when the entry was queued
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp of the last status change
    pub updated_at: DateTimeWithTimeZone,

    /// Timestamp when a response was processed for this entry
    pub synced_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Canonical sync type values for `sync_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
    Sale,
    InventoryPull,
    InventoryPush,
    CustomerSync,
}

impl SyncType {
    pub const fn as_str(self) -> &'static str {
        match self {
            SyncType::Sale => "sale",
            SyncType::InventoryPull => "inventory_pull",
            SyncType::InventoryPush => "inventory_push",
            SyncType::CustomerSync => "customer_sync",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sale" => Some(SyncType::Sale),
            "inventory_pull" => Some(SyncType::InventoryPull),
            "inventory_push" => Some(SyncType::InventoryPush),
            "customer_sync" => Some(SyncType::CustomerSync),
            _ => None,
        }
    }
}

/// Exchange direction for `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToQb,
    FromQb,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::ToQb => "to_qb",
            Direction::FromQb => "from_qb",
        }
    }
}

/// Kind of domain entity a log entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    Order,
    Booking,
    InventoryItem,
    Customer,
}

impl ReferenceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ReferenceType::Order => "order",
            ReferenceType::Booking => "booking",
            ReferenceType::InventoryItem => "inventory_item",
            ReferenceType::Customer => "customer",
        }
    }
}

/// Lifecycle status values for `status`.
///
/// Legal transitions: pending → processing → {completed, failed};
/// failed → pending only via explicit retry. Completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SyncStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Processing => "processing",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SyncStatus::Pending),
            "processing" => Some(SyncStatus::Processing),
            "completed" => Some(SyncStatus::Completed),
            "failed" => Some(SyncStatus::Failed),
            _ => None,
        }
    }

    /// Whether a row may move from `self` to `next`.
    pub fn can_transition_to(self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Pending, SyncStatus::Processing)
                | (SyncStatus::Processing, SyncStatus::Completed)
                | (SyncStatus::Processing, SyncStatus::Failed)
                | (SyncStatus::Failed, SyncStatus::Pending)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_is_terminal() {
        for next in [
            SyncStatus::Pending,
            SyncStatus::Processing,
            SyncStatus::Completed,
            SyncStatus::Failed,
        ] {
            assert!(!SyncStatus::Completed.can_transition_to(next));
        }
    }

    #[test]
    fn failed_can_only_return_to_pending() {
        assert!(SyncStatus::Failed.can_transition_to(SyncStatus::Pending));
        assert!(!SyncStatus::Failed.can_transition_to(SyncStatus::Completed));
        assert!(!SyncStatus::Failed.can_transition_to(SyncStatus::Processing));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            SyncStatus::Pending,
            SyncStatus::Processing,
            SyncStatus::Completed,
            SyncStatus::Failed,
        ] {
            assert_eq!(SyncStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SyncStatus::parse("bogus"), None);
    }
}
