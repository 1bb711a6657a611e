//! DomainEvent entity model
//!
//! SeaORM entity for the domain_events table: the durable trigger queue the
//! order/booking services append to. The event consumer drains it and queues
//! the matching sync, keeping integration failures away from the producers.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// DomainEvent entity, one row per business trigger
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "domain_events")]
pub struct Model {
    /// Unique identifier for the event (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Event kind (order_completed or booking_checked_out)
    pub kind: String,

    /// Identifier of the order or booking the event refers to
    pub reference_id: Uuid,

    /// Denormalized snapshot of the referenced entity, produced by the
    /// emitting domain service
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Option<JsonValue>,

    /// Consumption status (pending, consumed, failed)
    pub status: String,

    /// Consumer error detail when consumption failed
    pub error: Option<String>,

    /// Timestamp when the event was appended
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the event was consumed
    pub consumed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Canonical event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OrderCompleted,
    BookingCheckedOut,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::OrderCompleted => "order_completed",
            EventKind::BookingCheckedOut => "booking_checked_out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "order_completed" => Some(EventKind::OrderCompleted),
            "booking_checked_out" => Some(EventKind::BookingCheckedOut),
            _ => None,
        }
    }
}
