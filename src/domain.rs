//! Domain boundary for the sync bridge.
//!
//! The order/booking/customer services live outside this subsystem; the
//! bridge only consumes read-only snapshots of their entities. [`DomainStore`]
//! is the seam: the shipped implementation resolves snapshots from the
//! payloads the domain services attach to their durable events, and tests
//! substitute an in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::domain_event::{self, EventKind};
use crate::qbxml::PaymentMethod;

/// Errors surfaced by a domain store implementation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain store error: {0}")]
    Store(String),
    #[error("malformed domain snapshot for {kind} {id}: {details}")]
    MalformedSnapshot {
        kind: &'static str,
        id: Uuid,
        details: String,
    },
}

/// One line of a completed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub hotel_item_id: Uuid,
    pub hotel_item_type: String,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub sales_tax_code: Option<String>,
}

/// Snapshot of an order that reached the completed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedOrder {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub memo: Option<String>,
    pub items: Vec<OrderItem>,
}

/// Snapshot of a booking that was checked out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedOutBooking {
    pub id: Uuid,
    #[serde(default)]
    pub guest_user_id: Option<Uuid>,
    /// Hotel item representing the room type; must be mapped before the
    /// booking can be forwarded.
    pub room_item_id: Uuid,
    pub room_item_type: String,
    pub room_name: String,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub nightly_rate: f64,
    pub payment_method: PaymentMethod,
    pub checked_out_at: DateTime<Utc>,
}

impl CheckedOutBooking {
    /// Total nights is the whole-day difference between checkout and checkin.
    pub fn nights(&self) -> i64 {
        (self.checkout_date - self.checkin_date).num_days()
    }
}

/// Snapshot of a hotel user to be created as a QuickBooks customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub user_id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Read-only access to domain entities, keyed by the identifiers carried in
/// durable events and sync log rows.
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Resolve a completed order, or `None` when the order does not exist or
    /// never completed.
    async fn completed_order(&self, order_id: Uuid) -> Result<Option<CompletedOrder>, DomainError>;

    /// Resolve a checked-out booking.
    async fn checked_out_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<CheckedOutBooking>, DomainError>;

    /// Resolve a hotel user profile for customer sync.
    async fn customer_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CustomerProfile>, DomainError>;
}

/// [`DomainStore`] backed by the snapshots the domain services attach to
/// their durable events. The most recent event for a reference wins.
pub struct SnapshotDomainStore {
    db: DatabaseConnection,
}

impl SnapshotDomainStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn latest_payload(
        &self,
        kind: EventKind,
        reference_id: Uuid,
    ) -> Result<Option<serde_json::Value>, DomainError> {
        let event = domain_event::Entity::find()
            .filter(domain_event::Column::Kind.eq(kind.as_str()))
            .filter(domain_event::Column::ReferenceId.eq(reference_id))
            .order_by_desc(domain_event::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        Ok(event.and_then(|e| e.payload))
    }
}

#[async_trait]
impl DomainStore for SnapshotDomainStore {
    async fn completed_order(&self, order_id: Uuid) -> Result<Option<CompletedOrder>, DomainError> {
        let Some(payload) = self
            .latest_payload(EventKind::OrderCompleted, order_id)
            .await?
        else {
            return Ok(None);
        };

        serde_json::from_value(payload)
            .map(Some)
            .map_err(|e| DomainError::MalformedSnapshot {
                kind: "order",
                id: order_id,
                details: e.to_string(),
            })
    }

    async fn checked_out_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<CheckedOutBooking>, DomainError> {
        let Some(payload) = self
            .latest_payload(EventKind::BookingCheckedOut, booking_id)
            .await?
        else {
            return Ok(None);
        };

        serde_json::from_value(payload)
            .map(Some)
            .map_err(|e| DomainError::MalformedSnapshot {
                kind: "booking",
                id: booking_id,
                details: e.to_string(),
            })
    }

    async fn customer_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CustomerProfile>, DomainError> {
        // Customer snapshots ride on order events; take the newest order for
        // this user that carries one.
        let events = domain_event::Entity::find()
            .filter(domain_event::Column::Kind.eq(EventKind::OrderCompleted.as_str()))
            .order_by_desc(domain_event::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        for event in events {
            let Some(payload) = event.payload else {
                continue;
            };
            let Some(customer) = payload.get("customer") else {
                continue;
            };
            let profile: CustomerProfile = match serde_json::from_value(customer.clone()) {
                Ok(profile) => profile,
                Err(_) => continue,
            };
            if profile.user_id == user_id {
                return Ok(Some(profile));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_nights_is_whole_day_difference() {
        let booking = CheckedOutBooking {
            id: Uuid::new_v4(),
            guest_user_id: None,
            room_item_id: Uuid::new_v4(),
            room_item_type: "room_type".to_string(),
            room_name: "Deluxe Double".to_string(),
            checkin_date: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
            checkout_date: NaiveDate::from_ymd_opt(2026, 8, 13).unwrap(),
            nightly_rate: 850.0,
            payment_method: PaymentMethod::CreditCard,
            checked_out_at: Utc::now(),
        };
        assert_eq!(booking.nights(), 3);
    }

    #[test]
    fn order_snapshot_round_trips_through_json() {
        let order = CompletedOrder {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            payment_method: PaymentMethod::Cash,
            completed_at: Utc::now(),
            memo: None,
            items: vec![OrderItem {
                hotel_item_id: Uuid::new_v4(),
                hotel_item_type: "menu_item".to_string(),
                description: "Club Sandwich".to_string(),
                quantity: 2.0,
                unit_price: 500.0,
                sales_tax_code: None,
            }],
        };

        let value = serde_json::to_value(&order).unwrap();
        let back: CompletedOrder = serde_json::from_value(value).unwrap();
        assert_eq!(back, order);
    }
}
