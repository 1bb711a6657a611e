//! Shared fixtures for integration tests: an in-memory database with the
//! full schema applied, a configured bridge, and a canned domain store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use qbwc_bridge::credentials::hash_password;
use qbwc_bridge::domain::{
    CheckedOutBooking, CompletedOrder, CustomerProfile, DomainError, DomainStore, OrderItem,
};
use qbwc_bridge::migration::{Migrator, MigratorTrait};
use qbwc_bridge::orchestrator::{SyncOrchestrator, SyncSettings};
use qbwc_bridge::protocol::ProtocolHandler;
use qbwc_bridge::qbxml::PaymentMethod;
use qbwc_bridge::repositories::{ConfigUpdate, QbwcConfigRepository};
use qbwc_bridge::sessions::SessionManager;

pub const USERNAME: &str = "qbwc";
pub const PASSWORD: &str = "hunter2";

pub async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

/// Insert the configuration row with all sync flags enabled.
pub async fn configure_bridge(db: &DatabaseConnection) {
    configure_bridge_with_flags(db, true, true, true).await;
}

pub async fn configure_bridge_with_flags(
    db: &DatabaseConnection,
    sync_enabled: bool,
    sync_sales: bool,
    sync_inventory: bool,
) {
    QbwcConfigRepository::new(db.clone())
        .upsert(ConfigUpdate {
            sync_enabled,
            sync_sales,
            sync_inventory,
            qbwc_username: USERNAME.to_string(),
            qbwc_password_hash: hash_password(PASSWORD),
            company_file: Some("C:\\POS\\hotel.qbw".to_string()),
        })
        .await
        .expect("store configuration");
}

/// Canned snapshots keyed by identifier, standing in for the domain services.
#[derive(Default)]
pub struct FixtureDomainStore {
    pub orders: HashMap<Uuid, CompletedOrder>,
    pub bookings: HashMap<Uuid, CheckedOutBooking>,
    pub profiles: HashMap<Uuid, CustomerProfile>,
}

#[async_trait]
impl DomainStore for FixtureDomainStore {
    async fn completed_order(&self, order_id: Uuid) -> Result<Option<CompletedOrder>, DomainError> {
        Ok(self.orders.get(&order_id).cloned())
    }

    async fn checked_out_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<CheckedOutBooking>, DomainError> {
        Ok(self.bookings.get(&booking_id).cloned())
    }

    async fn customer_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CustomerProfile>, DomainError> {
        Ok(self.profiles.get(&user_id).cloned())
    }
}

pub fn order_item(hotel_item_id: Uuid, description: &str, quantity: f64, price: f64) -> OrderItem {
    OrderItem {
        hotel_item_id,
        hotel_item_type: "menu_item".to_string(),
        description: description.to_string(),
        quantity,
        unit_price: price,
        sales_tax_code: None,
    }
}

pub fn completed_order(order_id: Uuid, items: Vec<OrderItem>) -> CompletedOrder {
    CompletedOrder {
        id: order_id,
        user_id: None,
        payment_method: PaymentMethod::Cash,
        completed_at: Utc::now(),
        memo: None,
        items,
    }
}

pub fn orchestrator(
    db: &DatabaseConnection,
    store: FixtureDomainStore,
) -> Arc<SyncOrchestrator> {
    Arc::new(SyncOrchestrator::new(
        db.clone(),
        Arc::new(store),
        SyncSettings::default(),
    ))
}

pub fn protocol(db: &DatabaseConnection, orchestrator: Arc<SyncOrchestrator>) -> ProtocolHandler {
    ProtocolHandler::new(
        Arc::new(SessionManager::new(None)),
        orchestrator,
        QbwcConfigRepository::new(db.clone()),
    )
}

/// Successful `SalesReceiptAddRs` response carrying the given TxnID.
pub fn sales_receipt_ok(txn_id: &str, ref_number: &str) -> String {
    format!(
        "<?xml version=\"1.0\" ?><QBXML><QBXMLMsgsRs>\
         <SalesReceiptAddRs statusCode=\"0\" statusMessage=\"Status OK\">\
         <SalesReceiptRet><TxnID>{txn_id}</TxnID><RefNumber>{ref_number}</RefNumber>\
         </SalesReceiptRet></SalesReceiptAddRs></QBXMLMsgsRs></QBXML>"
    )
}

/// Failed `SalesReceiptAddRs` response with a non-zero status code.
pub fn sales_receipt_error(code: &str, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" ?><QBXML><QBXMLMsgsRs>\
         <SalesReceiptAddRs statusCode=\"{code}\" statusMessage=\"{message}\" />\
         </QBXMLMsgsRs></QBXML>"
    )
}

/// Successful `ItemInventoryQueryRs` with one returned row.
pub fn inventory_query_ok(list_id: &str, quantity: f64, average_cost: f64) -> String {
    format!(
        "<?xml version=\"1.0\" ?><QBXML><QBXMLMsgsRs>\
         <ItemInventoryQueryRs statusCode=\"0\" statusMessage=\"Status OK\">\
         <ItemInventoryRet><ListID>{list_id}</ListID><FullName>Test Item</FullName>\
         <QuantityOnHand>{quantity}</QuantityOnHand><AverageCost>{average_cost}</AverageCost>\
         </ItemInventoryRet></ItemInventoryQueryRs></QBXMLMsgsRs></QBXML>"
    )
}

/// Successful `CustomerAddRs` carrying the assigned ListID.
pub fn customer_add_ok(list_id: &str) -> String {
    format!(
        "<?xml version=\"1.0\" ?><QBXML><QBXMLMsgsRs>\
         <CustomerAddRs statusCode=\"0\" statusMessage=\"Status OK\">\
         <CustomerRet><ListID>{list_id}</ListID><Name>Guest</Name></CustomerRet>\
         </CustomerAddRs></QBXMLMsgsRs></QBXML>"
    )
}
