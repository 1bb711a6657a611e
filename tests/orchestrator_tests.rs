//! Orchestrator behavior against a real schema: gating flags, build
//! failures, retries, and response processing.

mod support;

use uuid::Uuid;

use qbwc_bridge::models::sync_log::SyncStatus;
use qbwc_bridge::orchestrator::SyncError;
use qbwc_bridge::repositories::{
    CustomerMappingRepository, ItemMappingRepository, SyncLogRepository,
};

use support::{
    FixtureDomainStore, completed_order, configure_bridge, configure_bridge_with_flags,
    customer_add_ok, order_item, orchestrator, sales_receipt_error, test_db,
};

#[tokio::test]
async fn sales_sync_requires_the_sales_flag() {
    let db = test_db().await;
    configure_bridge_with_flags(&db, true, false, true).await;

    let order_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.orders.insert(
        order_id,
        completed_order(order_id, vec![order_item(Uuid::new_v4(), "Coffee", 1.0, 35.0)]),
    );

    let result = orchestrator(&db, store).sync_completed_order(order_id).await;
    assert!(matches!(result, Err(SyncError::Disabled(_))));
}

#[tokio::test]
async fn inventory_sync_requires_the_inventory_flag() {
    let db = test_db().await;
    configure_bridge_with_flags(&db, true, true, false).await;

    let result = orchestrator(&db, FixtureDomainStore::default())
        .sync_inventory_from_qb()
        .await;
    assert!(matches!(result, Err(SyncError::Disabled(_))));
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let result = orchestrator(&db, FixtureDomainStore::default())
        .sync_completed_order(Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(SyncError::NotFound { entity: "order", .. })));
}

#[tokio::test]
async fn order_without_lines_is_rejected() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let order_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store
        .orders
        .insert(order_id, completed_order(order_id, Vec::new()));

    let result = orchestrator(&db, store).sync_completed_order(order_id).await;
    assert!(matches!(result, Err(SyncError::Precondition { .. })));
}

#[tokio::test]
async fn unmapped_line_item_records_a_failed_entry_without_raising() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let order_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.orders.insert(
        order_id,
        completed_order(
            order_id,
            vec![order_item(Uuid::new_v4(), "Mystery Dish", 1.0, 99.0)],
        ),
    );

    let entry = orchestrator(&db, store)
        .sync_completed_order(order_id)
        .await
        .unwrap();
    assert_eq!(entry.status, SyncStatus::Failed.as_str());
    assert!(entry.qbxml_request.is_none());
    let message = entry.error_message.unwrap();
    assert!(message.contains("Mystery Dish"), "unexpected message: {message}");
}

#[tokio::test]
async fn unmapped_adjustment_target_records_a_failed_entry() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let entry = orchestrator(&db, FixtureDomainStore::default())
        .sync_inventory_adjustment(Uuid::new_v4(), "minibar_item", 12.0, None)
        .await
        .unwrap();
    assert_eq!(entry.status, SyncStatus::Failed.as_str());
    assert!(entry.qbxml_request.is_none());
}

#[tokio::test]
async fn mapped_adjustment_is_queued_with_request_body() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let item_id = Uuid::new_v4();
    ItemMappingRepository::new(db.clone())
        .upsert(item_id, "minibar_item", "80000003-5", "Minibar:Water", true)
        .await
        .unwrap();

    let entry = orchestrator(&db, FixtureDomainStore::default())
        .sync_inventory_adjustment(item_id, "minibar_item", 48.0, Some(9.5))
        .await
        .unwrap();
    assert_eq!(entry.status, SyncStatus::Pending.as_str());
    let xml = entry.qbxml_request.unwrap();
    assert!(xml.contains("InventoryAdjustmentAddRq"));
    assert!(xml.contains("80000003-5"));
}

#[tokio::test]
async fn remote_error_code_fails_the_entry_with_the_reported_message() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let item_id = Uuid::new_v4();
    ItemMappingRepository::new(db.clone())
        .upsert(item_id, "menu_item", "80000001-3", "Food:Cake", false)
        .await
        .unwrap();

    let order_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.orders.insert(
        order_id,
        completed_order(order_id, vec![order_item(item_id, "Cake", 1.0, 80.0)]),
    );

    let orchestrator = orchestrator(&db, store);
    let queued = orchestrator.sync_completed_order(order_id).await.unwrap();
    orchestrator.mark_request_sent(queued.id).await.unwrap();

    let updated = orchestrator
        .process_qb_response(
            queued.id,
            &sales_receipt_error("3140", "Invalid reference to an item"),
            true,
        )
        .await
        .unwrap();
    assert_eq!(updated.status, SyncStatus::Failed.as_str());
    let message = updated.error_message.unwrap();
    assert!(message.contains("3140"));
    assert!(message.contains("Invalid reference to an item"));
}

#[tokio::test]
async fn completed_entries_are_never_reprocessed() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let item_id = Uuid::new_v4();
    ItemMappingRepository::new(db.clone())
        .upsert(item_id, "menu_item", "80000001-4", "Food:Pie", false)
        .await
        .unwrap();

    let order_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.orders.insert(
        order_id,
        completed_order(order_id, vec![order_item(item_id, "Pie", 1.0, 60.0)]),
    );

    let orchestrator = orchestrator(&db, store);
    let queued = orchestrator.sync_completed_order(order_id).await.unwrap();
    orchestrator.mark_request_sent(queued.id).await.unwrap();
    let completed = orchestrator
        .process_qb_response(queued.id, &support::sales_receipt_ok("T-9", "r"), true)
        .await
        .unwrap();
    assert_eq!(completed.status, SyncStatus::Completed.as_str());

    // A duplicate delivery with a failing payload must not regress the row.
    let again = orchestrator
        .process_qb_response(queued.id, &sales_receipt_error("500", "dup"), true)
        .await
        .unwrap();
    assert_eq!(again.status, SyncStatus::Completed.as_str());
    assert_eq!(again.qb_transaction_id.as_deref(), Some("T-9"));
}

#[tokio::test]
async fn retry_resets_a_failed_entry_until_the_limit() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let item_id = Uuid::new_v4();
    ItemMappingRepository::new(db.clone())
        .upsert(item_id, "menu_item", "80000001-5", "Food:Stew", false)
        .await
        .unwrap();

    let order_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.orders.insert(
        order_id,
        completed_order(order_id, vec![order_item(item_id, "Stew", 1.0, 150.0)]),
    );

    let orchestrator = orchestrator(&db, store);
    let queued = orchestrator.sync_completed_order(order_id).await.unwrap();

    let max_retries = orchestrator.settings().max_retries;
    for attempt in 1..=max_retries {
        orchestrator.mark_request_sent(queued.id).await.unwrap();
        orchestrator
            .process_qb_response(queued.id, "", false)
            .await
            .unwrap();

        let retried = orchestrator.retry_failed_sync(queued.id).await.unwrap();
        assert_eq!(retried.status, SyncStatus::Pending.as_str());
        assert_eq!(retried.retry_count, attempt);
        assert!(retried.error_message.is_none());
    }

    // Budget exhausted: fail once more and the retry is refused.
    orchestrator.mark_request_sent(queued.id).await.unwrap();
    orchestrator
        .process_qb_response(queued.id, "", false)
        .await
        .unwrap();
    let refused = orchestrator.retry_failed_sync(queued.id).await;
    assert!(matches!(refused, Err(SyncError::RetryNotAllowed { .. })));
}

#[tokio::test]
async fn response_for_an_entry_not_in_flight_is_ignored() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let item_id = Uuid::new_v4();
    ItemMappingRepository::new(db.clone())
        .upsert(item_id, "menu_item", "80000001-8", "Food:Juice", false)
        .await
        .unwrap();

    let order_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.orders.insert(
        order_id,
        completed_order(order_id, vec![order_item(item_id, "Juice", 1.0, 25.0)]),
    );

    let orchestrator = orchestrator(&db, store);
    let queued = orchestrator.sync_completed_order(order_id).await.unwrap();
    assert_eq!(queued.status, SyncStatus::Pending.as_str());

    // A response arriving before the request was ever handed out must not
    // move the entry; it stays queued for the next polling cycle.
    let untouched = orchestrator
        .process_qb_response(queued.id, &sales_receipt_error("500", "stray"), true)
        .await
        .unwrap();
    assert_eq!(untouched.status, SyncStatus::Pending.as_str());
    assert!(untouched.error_message.is_none());
    assert!(untouched.qbxml_response.is_none());
}

#[tokio::test]
async fn retry_of_a_pending_entry_is_refused() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let item_id = Uuid::new_v4();
    ItemMappingRepository::new(db.clone())
        .upsert(item_id, "menu_item", "80000001-6", "Food:Toast", false)
        .await
        .unwrap();

    let order_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.orders.insert(
        order_id,
        completed_order(order_id, vec![order_item(item_id, "Toast", 1.0, 40.0)]),
    );

    let orchestrator = orchestrator(&db, store);
    let queued = orchestrator.sync_completed_order(order_id).await.unwrap();

    let result = orchestrator.retry_failed_sync(queued.id).await;
    assert!(matches!(result, Err(SyncError::RetryNotAllowed { .. })));
}

#[tokio::test]
async fn customer_sync_stores_the_assigned_list_id() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let user_id = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.profiles.insert(
        user_id,
        qbwc_bridge::domain::CustomerProfile {
            user_id,
            display_name: "Ada Guest".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Guest".to_string()),
            phone: None,
            email: Some("ada@example.com".to_string()),
            address_lines: vec!["1 Hotel Way".to_string()],
            city: Some("Cape Town".to_string()),
            postal_code: Some("8001".to_string()),
            country: Some("South Africa".to_string()),
        },
    );

    let orchestrator = orchestrator(&db, store);
    let queued = orchestrator.sync_customer(user_id).await.unwrap();
    assert_eq!(queued.status, SyncStatus::Pending.as_str());
    assert!(queued.qbxml_request.as_deref().unwrap().contains("CustomerAddRq"));

    orchestrator.mark_request_sent(queued.id).await.unwrap();
    orchestrator
        .process_qb_response(queued.id, &customer_add_ok("80000009-1"), true)
        .await
        .unwrap();

    let mapping = CustomerMappingRepository::new(db.clone())
        .find_for_user(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mapping.qb_customer_list_id, "80000009-1");
}

#[tokio::test]
async fn statistics_aggregate_per_status() {
    let db = test_db().await;
    configure_bridge(&db).await;

    let item_id = Uuid::new_v4();
    ItemMappingRepository::new(db.clone())
        .upsert(item_id, "menu_item", "80000001-7", "Food:Salad", false)
        .await
        .unwrap();

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let mut store = FixtureDomainStore::default();
    store.orders.insert(
        first,
        completed_order(first, vec![order_item(item_id, "Salad", 1.0, 70.0)]),
    );
    store.orders.insert(
        second,
        completed_order(second, vec![order_item(item_id, "Salad", 2.0, 70.0)]),
    );

    let orchestrator = orchestrator(&db, store);
    let first_entry = orchestrator.sync_completed_order(first).await.unwrap();
    orchestrator.sync_completed_order(second).await.unwrap();

    orchestrator.mark_request_sent(first_entry.id).await.unwrap();
    orchestrator
        .process_qb_response(first_entry.id, &support::sales_receipt_ok("T-3", "r"), true)
        .await
        .unwrap();

    let stats = orchestrator.get_sync_statistics().await.unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.failed, 0);
    assert!(stats.last_successful_sync.is_some());

    let pending = SyncLogRepository::new(db.clone()).list_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
}
