//! Event consumer tests: durable triggers are claimed oldest-first and
//! marked consumed or failed, and a disabled pipeline defers the batch.

mod support;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use qbwc_bridge::domain::SnapshotDomainStore;
use qbwc_bridge::event_consumer::{ConsumerConfig, EventConsumer};
use qbwc_bridge::models::domain_event::{self, EventKind};
use qbwc_bridge::models::sync_log::SyncStatus;
use qbwc_bridge::orchestrator::{SyncOrchestrator, SyncSettings};
use qbwc_bridge::repositories::{
    DomainEventRepository, ItemMappingRepository, SyncLogRepository,
};

use support::{completed_order, configure_bridge, configure_bridge_with_flags, order_item, test_db};

fn consumer(db: &sea_orm::DatabaseConnection) -> EventConsumer {
    let orchestrator = Arc::new(SyncOrchestrator::new(
        db.clone(),
        Arc::new(SnapshotDomainStore::new(db.clone())),
        SyncSettings::default(),
    ));
    EventConsumer::new(
        db.clone(),
        orchestrator,
        ConsumerConfig {
            tick: Duration::from_secs(5),
            claim_batch: 25,
        },
    )
}

async fn event_status(db: &sea_orm::DatabaseConnection, id: Uuid) -> domain_event::Model {
    domain_event::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn order_event_with_snapshot_queues_a_sale() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let item_id = Uuid::new_v4();
    ItemMappingRepository::new(db.clone())
        .upsert(item_id, "menu_item", "80000001-8", "Food:Burger", false)
        .await
        .unwrap();

    let order_id = Uuid::new_v4();
    let snapshot = completed_order(order_id, vec![order_item(item_id, "Burger", 1.0, 95.0)]);
    let event = DomainEventRepository::new(db.clone())
        .append(
            EventKind::OrderCompleted,
            order_id,
            Some(serde_json::to_value(&snapshot).unwrap()),
        )
        .await
        .unwrap();

    let processed = consumer(&db).tick().await.unwrap();
    assert_eq!(processed, 1);

    assert_eq!(event_status(&db, event.id).await.status, "consumed");

    let pending = SyncLogRepository::new(db.clone()).list_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].reference_id, order_id);
    assert_eq!(pending[0].status, SyncStatus::Pending.as_str());
}

#[tokio::test]
async fn event_without_snapshot_is_marked_failed() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let event = DomainEventRepository::new(db.clone())
        .append(EventKind::OrderCompleted, Uuid::new_v4(), None)
        .await
        .unwrap();

    consumer(&db).tick().await.unwrap();

    let row = event_status(&db, event.id).await;
    assert_eq!(row.status, "failed");
    assert!(row.error.is_some());
}

#[tokio::test]
async fn disabled_pipeline_defers_the_whole_batch() {
    let db = test_db().await;
    configure_bridge_with_flags(&db, false, true, true).await;

    let events = DomainEventRepository::new(db.clone());
    events
        .append(EventKind::OrderCompleted, Uuid::new_v4(), None)
        .await
        .unwrap();
    events
        .append(EventKind::BookingCheckedOut, Uuid::new_v4(), None)
        .await
        .unwrap();

    consumer(&db).tick().await.unwrap();

    // Nothing consumed or failed; the batch waits for the flag to come back.
    let still_pending = domain_event::Entity::find()
        .filter(domain_event::Column::Status.eq("pending"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(still_pending.len(), 2);
}
