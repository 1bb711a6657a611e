//! # Sync Orchestrator
//!
//! Decides what to sync and when: builds QBXML through the adapter, queues
//! entries in the sync log, parses responses coming back from polling cycles,
//! applies inventory figures, and exposes retry and statistics to the admin
//! surface.
//!
//! Mapping failures never propagate past a triggering business event: they
//! are recorded as Failed log rows with no request body, visible on the
//! dashboard, while the event producer proceeds untouched.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{CheckedOutBooking, CompletedOrder, CustomerProfile, DomainError, DomainStore};
use crate::models::item_mapping;
use crate::models::sync_log::{
    self, Direction, ReferenceType, SyncStatus, SyncType,
};
use crate::qbxml::{
    self, CustomerAdd, InventoryAdjustment, InventoryQuery, QbxmlError, ReceiptLine, SalesReceipt,
};
use crate::repositories::{
    CustomerMappingRepository, ItemMappingRepository, NewSyncLogEntry, QbwcConfigRepository,
    SyncLogRepository, SyncStatistics,
};

/// Orchestrator tuning knobs, sourced from [`crate::config::AppConfig`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Maximum operator-triggered retries per log entry.
    pub max_retries: i32,
    /// Pending entries loaded per Web Connector polling cycle.
    pub pending_batch_size: u64,
    /// MaxReturned cap on inventory queries.
    pub inventory_max_returned: u32,
    /// QuickBooks account receiving inventory adjustments.
    pub adjustment_account: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            pending_batch_size: 100,
            inventory_max_returned: 100,
            adjustment_account: "Inventory Asset".to_string(),
        }
    }
}

/// Errors surfaced to orchestrator callers. Build and parse failures inside
/// sync flows are persisted as Failed log rows instead of raised; what
/// propagates here is misconfiguration and misuse.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Sync disabled or unconfigured; the caller must not proceed.
    #[error("sync is not enabled: {0}")]
    Disabled(String),

    #[error("{entity} {id} not found or not in a syncable state")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} {id} cannot be synced: {reason}")]
    Precondition {
        entity: &'static str,
        id: Uuid,
        reason: String,
    },

    #[error("sync log entry {0} not found")]
    LogNotFound(Uuid),

    #[error("retry not allowed for sync log entry {id}: {reason}")]
    RetryNotAllowed { id: Uuid, reason: String },

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Orchestrates sync queueing and response processing over the sync log.
pub struct SyncOrchestrator {
    db: DatabaseConnection,
    domain: Arc<dyn DomainStore>,
    settings: SyncSettings,
    sync_log: SyncLogRepository,
    item_mappings: ItemMappingRepository,
    customer_mappings: CustomerMappingRepository,
    config: QbwcConfigRepository,
}

impl SyncOrchestrator {
    pub fn new(db: DatabaseConnection, domain: Arc<dyn DomainStore>, settings: SyncSettings) -> Self {
        Self {
            sync_log: SyncLogRepository::new(db.clone()),
            item_mappings: ItemMappingRepository::new(db.clone()),
            customer_mappings: CustomerMappingRepository::new(db.clone()),
            config: QbwcConfigRepository::new(db.clone()),
            db,
            domain,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    async fn require_config(
        &self,
        flag: impl Fn(&crate::models::qbwc_config::Model) -> bool,
        flag_name: &str,
    ) -> Result<crate::models::qbwc_config::Model, SyncError> {
        let Some(config) = self.config.get().await? else {
            return Err(SyncError::Disabled(
                "Web Connector credentials are not configured".to_string(),
            ));
        };
        if !config.sync_enabled {
            return Err(SyncError::Disabled("sync_enabled is off".to_string()));
        }
        if !flag(&config) {
            return Err(SyncError::Disabled(format!("{flag_name} is off")));
        }
        Ok(config)
    }

    /// Queue a sales receipt for a completed order.
    ///
    /// An unmapped line item yields a Failed log entry (no request body) and
    /// returns it; the order flow that triggered this must never fail because
    /// of the integration.
    pub async fn sync_completed_order(
        &self,
        order_id: Uuid,
    ) -> Result<sync_log::Model, SyncError> {
        self.require_config(|c| c.sync_sales, "sync_sales").await?;

        let order = self
            .domain
            .completed_order(order_id)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "order",
                id: order_id,
            })?;

        if order.items.is_empty() {
            return Err(SyncError::Precondition {
                entity: "order",
                id: order_id,
                reason: "order has no line items".to_string(),
            });
        }

        let receipt = self.order_to_receipt(&order).await?;
        self.queue_receipt(
            receipt,
            SyncType::Sale,
            ReferenceType::Order,
            order_id,
        )
        .await
    }

    /// Queue a sales receipt for a checked-out booking: one line for the stay
    /// at `nights × nightly_rate`.
    pub async fn sync_completed_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<sync_log::Model, SyncError> {
        self.require_config(|c| c.sync_sales, "sync_sales").await?;

        let booking = self
            .domain
            .checked_out_booking(booking_id)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "booking",
                id: booking_id,
            })?;

        let receipt = self.booking_to_receipt(&booking).await?;
        self.queue_receipt(
            receipt,
            SyncType::Sale,
            ReferenceType::Booking,
            booking_id,
        )
        .await
    }

    /// Queue one inventory query per mapping flagged for inventory sync and
    /// stamp the watermark. The watermark marks submission, not confirmation.
    pub async fn sync_inventory_from_qb(&self) -> Result<Vec<sync_log::Model>, SyncError> {
        self.require_config(|c| c.sync_inventory, "sync_inventory")
            .await?;

        let mappings = self.item_mappings.list_inventory_synced().await?;
        let mut queued = Vec::with_capacity(mappings.len());

        for mapping in mappings {
            let query = InventoryQuery {
                max_returned: self.settings.inventory_max_returned,
                item_list_id: Some(mapping.qb_list_id.clone()),
            };
            let entry = match qbxml::build_inventory_query_request(&query) {
                Ok(xml) => {
                    self.sync_log
                        .create(NewSyncLogEntry {
                            sync_type: SyncType::InventoryPull,
                            direction: Direction::FromQb,
                            reference_type: ReferenceType::InventoryItem,
                            reference_id: mapping.hotel_item_id,
                            qbxml_request: Some(xml),
                            status: SyncStatus::Pending,
                            error_message: None,
                        })
                        .await?
                }
                Err(e) => {
                    self.record_build_failure(
                        SyncType::InventoryPull,
                        Direction::FromQb,
                        ReferenceType::InventoryItem,
                        mapping.hotel_item_id,
                        &e,
                    )
                    .await?
                }
            };
            queued.push(entry);
        }

        self.config
            .touch_last_inventory_sync(Utc::now().fixed_offset())
            .await?;

        info!(queued = queued.len(), "Inventory pull batch queued");
        Ok(queued)
    }

    /// Queue an inventory adjustment pushing a new absolute on-hand quantity
    /// to QuickBooks for one mapped item.
    pub async fn sync_inventory_adjustment(
        &self,
        hotel_item_id: Uuid,
        hotel_item_type: &str,
        new_quantity: f64,
        unit_cost: Option<f64>,
    ) -> Result<sync_log::Model, SyncError> {
        self.require_config(|c| c.sync_inventory, "sync_inventory")
            .await?;

        let Some(mapping) = self
            .item_mappings
            .find_for_item(hotel_item_id, hotel_item_type)
            .await?
        else {
            let err = QbxmlError::UnmappedItem(format!("{hotel_item_type} {hotel_item_id}"));
            return self
                .record_build_failure(
                    SyncType::InventoryPush,
                    Direction::ToQb,
                    ReferenceType::InventoryItem,
                    hotel_item_id,
                    &err,
                )
                .await
                .map_err(SyncError::from);
        };

        let adjustment = InventoryAdjustment {
            item_list_id: mapping.qb_list_id,
            adjustment_account: self.settings.adjustment_account.clone(),
            txn_date: Utc::now().date_naive(),
            new_quantity,
            unit_cost,
        };

        match qbxml::build_inventory_adjustment_request(&adjustment) {
            Ok(xml) => Ok(self
                .sync_log
                .create(NewSyncLogEntry {
                    sync_type: SyncType::InventoryPush,
                    direction: Direction::ToQb,
                    reference_type: ReferenceType::InventoryItem,
                    reference_id: hotel_item_id,
                    qbxml_request: Some(xml),
                    status: SyncStatus::Pending,
                    error_message: None,
                })
                .await?),
            Err(e) => Ok(self
                .record_build_failure(
                    SyncType::InventoryPush,
                    Direction::ToQb,
                    ReferenceType::InventoryItem,
                    hotel_item_id,
                    &e,
                )
                .await?),
        }
    }

    /// Queue a `CustomerAdd` for a hotel user without a customer mapping.
    /// Completion stores the ListID QuickBooks assigns.
    pub async fn sync_customer(&self, user_id: Uuid) -> Result<sync_log::Model, SyncError> {
        self.require_config(|c| c.sync_sales, "sync_sales").await?;

        let profile = self
            .domain
            .customer_profile(user_id)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "customer",
                id: user_id,
            })?;

        let request = profile_to_customer_add(&profile);
        match qbxml::build_customer_add_request(&request) {
            Ok(xml) => Ok(self
                .sync_log
                .create(NewSyncLogEntry {
                    sync_type: SyncType::CustomerSync,
                    direction: Direction::ToQb,
                    reference_type: ReferenceType::Customer,
                    reference_id: user_id,
                    qbxml_request: Some(xml),
                    status: SyncStatus::Pending,
                    error_message: None,
                })
                .await?),
            Err(e) => Ok(self
                .record_build_failure(
                    SyncType::CustomerSync,
                    Direction::ToQb,
                    ReferenceType::Customer,
                    user_id,
                    &e,
                )
                .await?),
        }
    }

    /// Transition a pending entry to processing once its request has been
    /// handed to the Web Connector.
    pub async fn mark_request_sent(&self, log_id: Uuid) -> Result<(), SyncError> {
        let entry = self
            .sync_log
            .find_by_id(log_id)
            .await?
            .ok_or(SyncError::LogNotFound(log_id))?;

        match SyncStatus::parse(&entry.status) {
            Some(status) if status.can_transition_to(SyncStatus::Processing) => {}
            _ => warn!(log_id = %log_id, status = %entry.status, "Entry sent while not pending"),
        }

        let mut active: sync_log::ActiveModel = entry.into();
        active.status = Set(SyncStatus::Processing.as_str().to_string());
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await?;
        Ok(())
    }

    /// Process a QBXML response for one log entry.
    ///
    /// Completed only when the transport-level success flag and the parsed
    /// response status agree; otherwise Failed with the most specific error
    /// available. Inventory quantities are applied in the same transaction as
    /// the status flip.
    pub async fn process_qb_response(
        &self,
        log_id: Uuid,
        qbxml_response: &str,
        transport_success: bool,
    ) -> Result<sync_log::Model, SyncError> {
        let entry = self
            .sync_log
            .find_by_id(log_id)
            .await?
            .ok_or(SyncError::LogNotFound(log_id))?;

        // Only an in-flight row can settle. A completed row never changes
        // again; a pending or failed row receiving a response is a duplicate
        // or out-of-order delivery and is left untouched.
        let current = SyncStatus::parse(&entry.status);
        let in_flight = current.is_some_and(|status| {
            status.can_transition_to(SyncStatus::Completed)
                && status.can_transition_to(SyncStatus::Failed)
        });
        if !in_flight {
            if current != Some(SyncStatus::Completed) {
                warn!(
                    log_id = %log_id,
                    status = %entry.status,
                    "Ignoring response for an entry that is not in flight"
                );
            }
            return Ok(entry);
        }

        let outcome = if !transport_success {
            Outcome::failed("Web Connector reported a transport error".to_string())
        } else {
            match SyncType::parse(&entry.sync_type) {
                Some(SyncType::Sale) => evaluate_sales_response(qbxml_response),
                Some(SyncType::InventoryPull) => self.evaluate_inventory_pull(qbxml_response).await?,
                Some(SyncType::InventoryPush) => evaluate_push_response(qbxml_response),
                Some(SyncType::CustomerSync) => {
                    self.evaluate_customer_response(&entry, qbxml_response).await?
                }
                None => Outcome::failed(format!("unknown sync type {}", entry.sync_type)),
            }
        };

        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await?;

        let entry_id = entry.id;
        let mut active: sync_log::ActiveModel = entry.into();
        active.qbxml_response = Set(Some(qbxml_response.to_string()));
        active.synced_at = Set(Some(now));
        active.updated_at = Set(now);

        match &outcome {
            Outcome::Completed {
                qb_transaction_id,
                inventory,
            } => {
                active.status = Set(SyncStatus::Completed.as_str().to_string());
                active.qb_transaction_id = Set(qb_transaction_id.clone());
                active.error_message = Set(None);

                // Side effects commit atomically with the status flip.
                for row in inventory {
                    let Some(mapping) = item_mapping::Entity::find()
                        .filter(item_mapping::Column::QbListId.eq(row.list_id.clone()))
                        .one(&txn)
                        .await?
                    else {
                        warn!(list_id = %row.list_id, "Inventory row for unknown mapping ignored");
                        continue;
                    };
                    let mut mapping_active: item_mapping::ActiveModel = mapping.into();
                    mapping_active.quantity_on_hand = Set(Some(row.quantity_on_hand));
                    if row.average_cost.is_some() {
                        mapping_active.average_cost = Set(row.average_cost);
                    }
                    mapping_active.quantity_updated_at = Set(Some(now));
                    mapping_active.updated_at = Set(now);
                    mapping_active.update(&txn).await?;
                }

                counter!("qbwc_sync_completed_total").increment(1);
            }
            Outcome::Failed { error } => {
                active.status = Set(SyncStatus::Failed.as_str().to_string());
                active.error_message = Set(Some(error.clone()));
                counter!("qbwc_sync_failed_total").increment(1);
            }
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        match &outcome {
            Outcome::Completed { .. } => {
                info!(log_id = %entry_id, "Sync completed");
            }
            Outcome::Failed { error } => {
                warn!(log_id = %entry_id, error = %error, "Sync failed");
            }
        }

        Ok(updated)
    }

    /// Reset a failed entry to pending for another polling cycle. Allowed
    /// only while the retry budget lasts; anything else is caller error.
    pub async fn retry_failed_sync(&self, log_id: Uuid) -> Result<sync_log::Model, SyncError> {
        let entry = self
            .sync_log
            .find_by_id(log_id)
            .await?
            .ok_or(SyncError::LogNotFound(log_id))?;

        let status = SyncStatus::parse(&entry.status);
        if !matches!(status, Some(s) if s.can_transition_to(SyncStatus::Pending)) {
            return Err(SyncError::RetryNotAllowed {
                id: log_id,
                reason: format!("entry is {}, only failed entries can be retried", entry.status),
            });
        }
        if entry.retry_count >= self.settings.max_retries {
            return Err(SyncError::RetryNotAllowed {
                id: log_id,
                reason: format!(
                    "retry limit of {} reached ({} attempts made)",
                    self.settings.max_retries, entry.retry_count
                ),
            });
        }

        let retry_count = entry.retry_count + 1;
        let mut active: sync_log::ActiveModel = entry.into();
        active.status = Set(SyncStatus::Pending.as_str().to_string());
        active.retry_count = Set(retry_count);
        active.error_message = Set(None);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(&self.db).await?;
        info!(log_id = %log_id, retry_count, "Failed sync reset to pending");
        Ok(updated)
    }

    /// Oldest-first pending entries, the sole feed for the protocol handler.
    pub async fn get_pending_requests(&self, limit: u64) -> Result<Vec<sync_log::Model>, SyncError> {
        Ok(self.sync_log.list_pending(limit).await?)
    }

    pub async fn get_sync_statistics(&self) -> Result<SyncStatistics, SyncError> {
        Ok(self.sync_log.statistics().await?)
    }

    async fn order_to_receipt(&self, order: &CompletedOrder) -> Result<SalesReceipt, SyncError> {
        let customer_list_id = match order.user_id {
            Some(user_id) => self
                .customer_mappings
                .find_for_user(user_id)
                .await?
                .map(|m| m.qb_customer_list_id),
            None => None,
        };

        let mut lines = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let mapping = self
                .item_mappings
                .find_for_item(item.hotel_item_id, &item.hotel_item_type)
                .await?;
            lines.push(ReceiptLine {
                item_list_id: mapping.map(|m| m.qb_list_id),
                description: item.description.clone(),
                quantity: item.quantity,
                rate: item.unit_price,
                sales_tax_code: item.sales_tax_code.clone(),
            });
        }

        Ok(SalesReceipt {
            customer_list_id,
            txn_date: order.completed_at.date_naive(),
            ref_number: format!("ORDER-{}", order.id),
            payment_method: order.payment_method,
            memo: order.memo.clone(),
            lines,
        })
    }

    async fn booking_to_receipt(
        &self,
        booking: &CheckedOutBooking,
    ) -> Result<SalesReceipt, SyncError> {
        let customer_list_id = match booking.guest_user_id {
            Some(user_id) => self
                .customer_mappings
                .find_for_user(user_id)
                .await?
                .map(|m| m.qb_customer_list_id),
            None => None,
        };

        let mapping = self
            .item_mappings
            .find_for_item(booking.room_item_id, &booking.room_item_type)
            .await?;
        let nights = booking.nights();

        Ok(SalesReceipt {
            customer_list_id,
            txn_date: booking.checked_out_at.date_naive(),
            ref_number: format!("BOOKING-{}", booking.id),
            payment_method: booking.payment_method,
            memo: Some(format!("{}, {} night(s)", booking.room_name, nights)),
            lines: vec![ReceiptLine {
                item_list_id: mapping.map(|m| m.qb_list_id),
                description: format!("Stay: {} ({} nights)", booking.room_name, nights),
                quantity: nights as f64,
                rate: booking.nightly_rate,
                sales_tax_code: None,
            }],
        })
    }

    async fn queue_receipt(
        &self,
        receipt: SalesReceipt,
        sync_type: SyncType,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<sync_log::Model, SyncError> {
        match qbxml::build_sales_receipt_request(&receipt) {
            Ok(xml) => Ok(self
                .sync_log
                .create(NewSyncLogEntry {
                    sync_type,
                    direction: Direction::ToQb,
                    reference_type,
                    reference_id,
                    qbxml_request: Some(xml),
                    status: SyncStatus::Pending,
                    error_message: None,
                })
                .await?),
            Err(e) => Ok(self
                .record_build_failure(sync_type, Direction::ToQb, reference_type, reference_id, &e)
                .await?),
        }
    }

    async fn record_build_failure(
        &self,
        sync_type: SyncType,
        direction: Direction,
        reference_type: ReferenceType,
        reference_id: Uuid,
        error: &QbxmlError,
    ) -> Result<sync_log::Model, sea_orm::DbErr> {
        warn!(
            reference_id = %reference_id,
            error = %error,
            "QBXML build failed, recording failed log entry"
        );
        counter!("qbwc_sync_build_failed_total").increment(1);

        self.sync_log
            .create(NewSyncLogEntry {
                sync_type,
                direction,
                reference_type,
                reference_id,
                qbxml_request: None,
                status: SyncStatus::Failed,
                error_message: Some(error.to_string()),
            })
            .await
    }

    async fn evaluate_inventory_pull(&self, response: &str) -> Result<Outcome, SyncError> {
        match qbxml::parse_inventory_query_response(response) {
            Ok(parsed) if parsed.status.is_success() => Ok(Outcome::Completed {
                qb_transaction_id: None,
                inventory: parsed.items,
            }),
            Ok(parsed) => Ok(Outcome::failed(format!(
                "Error {}: {}",
                parsed.status.code, parsed.status.message
            ))),
            Err(e) => Ok(Outcome::failed(e.to_string())),
        }
    }

    async fn evaluate_customer_response(
        &self,
        entry: &sync_log::Model,
        response: &str,
    ) -> Result<Outcome, SyncError> {
        match qbxml::parse_customer_add_response(response) {
            Ok(parsed) if parsed.status.is_success() => {
                if let Some(list_id) = &parsed.list_id {
                    self.customer_mappings
                        .upsert(entry.reference_id, list_id)
                        .await?;
                }
                Ok(Outcome::Completed {
                    qb_transaction_id: parsed.list_id,
                    inventory: Vec::new(),
                })
            }
            Ok(parsed) => Ok(Outcome::failed(format!(
                "Error {}: {}",
                parsed.status.code, parsed.status.message
            ))),
            Err(e) => Ok(Outcome::failed(e.to_string())),
        }
    }
}

enum Outcome {
    Completed {
        qb_transaction_id: Option<String>,
        inventory: Vec<qbxml::InventoryItemRow>,
    },
    Failed {
        error: String,
    },
}

impl Outcome {
    fn failed(error: String) -> Self {
        Outcome::Failed { error }
    }
}

fn evaluate_sales_response(response: &str) -> Outcome {
    match qbxml::parse_sales_receipt_response(response) {
        Ok(parsed) if parsed.status.is_success() => Outcome::Completed {
            qb_transaction_id: parsed.txn_id,
            inventory: Vec::new(),
        },
        Ok(parsed) => Outcome::failed(format!(
            "Error {}: {}",
            parsed.status.code, parsed.status.message
        )),
        Err(e) => Outcome::failed(e.to_string()),
    }
}

fn evaluate_push_response(response: &str) -> Outcome {
    match qbxml::validate_qbxml(response) {
        Ok(()) => match qbxml::extract_error_details(response) {
            Some(error) => Outcome::failed(error),
            None => Outcome::Completed {
                qb_transaction_id: None,
                inventory: Vec::new(),
            },
        },
        Err(e) => Outcome::failed(e.to_string()),
    }
}

fn profile_to_customer_add(profile: &CustomerProfile) -> CustomerAdd {
    CustomerAdd {
        name: profile.display_name.clone(),
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        phone: profile.phone.clone(),
        email: profile.email.clone(),
        bill_address: profile.address_lines.clone(),
        bill_city: profile.city.clone(),
        bill_state: None,
        bill_postal_code: profile.postal_code.clone(),
        bill_country: profile.country.clone(),
    }
}
