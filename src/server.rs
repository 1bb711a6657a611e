//! # Server Configuration
//!
//! Server setup for the Web Connector bridge: the SOAP endpoint the Web
//! Connector polls, the operator-facing admin API, and the background tasks
//! (event consumer, session sweeper) that run alongside them.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::domain::SnapshotDomainStore;
use crate::event_consumer::{ConsumerConfig, EventConsumer};
use crate::handlers;
use crate::orchestrator::{SyncOrchestrator, SyncSettings};
use crate::protocol::ProtocolHandler;
use crate::repositories::QbwcConfigRepository;
use crate::sessions::SessionManager;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub sessions: Arc<SessionManager>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub protocol: Arc<ProtocolHandler>,
}

fn sync_settings(config: &AppConfig) -> SyncSettings {
    SyncSettings {
        max_retries: config.sync.max_retries,
        pending_batch_size: config.sync.pending_batch_size,
        inventory_max_returned: config.sync.inventory_max_returned,
        adjustment_account: config.sync.adjustment_account.clone(),
    }
}

fn idle_timeout(config: &AppConfig) -> Option<Duration> {
    match config.session.idle_timeout_seconds {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

impl AppState {
    /// Assemble the full component graph over one database connection.
    pub fn new(config: Arc<AppConfig>, db: DatabaseConnection) -> Self {
        let sessions = Arc::new(SessionManager::new(idle_timeout(&config)));
        let domain = Arc::new(SnapshotDomainStore::new(db.clone()));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            db.clone(),
            domain,
            sync_settings(&config),
        ));
        let protocol = Arc::new(ProtocolHandler::new(
            Arc::clone(&sessions),
            Arc::clone(&orchestrator),
            QbwcConfigRepository::new(db.clone()),
        ));

        Self {
            config,
            db,
            sessions,
            orchestrator,
            protocol,
        }
    }

    #[cfg(test)]
    pub fn for_tests(config: Arc<AppConfig>, db: DatabaseConnection) -> Self {
        Self::new(config, db)
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/sync/log", get(handlers::sync::list_sync_log))
        .route("/api/sync/statistics", get(handlers::sync::sync_statistics))
        .route("/api/sync/pending", get(handlers::sync::list_pending))
        .route("/api/sync/log/{id}/retry", post(handlers::sync::retry_sync))
        .route(
            "/api/sync/inventory/pull",
            post(handlers::sync::trigger_inventory_pull),
        )
        .route(
            "/api/sync/inventory/adjustments",
            post(handlers::sync::create_inventory_adjustment),
        )
        .route("/api/sync/customers", post(handlers::sync::sync_customer))
        .route("/api/events", post(handlers::sync::append_event))
        .route(
            "/api/config",
            get(handlers::config::get_config).put(handlers::config::put_config),
        )
        .route(
            "/api/mappings/items",
            get(handlers::mappings::list_item_mappings)
                .post(handlers::mappings::upsert_item_mapping),
        )
        .route(
            "/api/mappings/customers",
            get(handlers::mappings::list_customer_mappings)
                .post(handlers::mappings::upsert_customer_mapping),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            crate::auth::auth_middleware,
        ));

    // The Web Connector cannot authenticate at the HTTP layer; /qbwc is open
    // and guarded by the protocol's own authenticate call.
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::health))
        .route("/qbwc", post(handlers::qbwc::soap_endpoint))
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server and its background tasks with the given configuration.
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);
    let state = AppState::new(Arc::clone(&config), db.clone());
    let shutdown = CancellationToken::new();

    let consumer = EventConsumer::new(
        db.clone(),
        Arc::clone(&state.orchestrator),
        ConsumerConfig {
            tick: Duration::from_secs(config.consumer.tick_seconds),
            claim_batch: config.consumer.claim_batch,
        },
    );
    let consumer_task = tokio::spawn(consumer.run(shutdown.clone()));

    let sweeper_task = tokio::spawn(Arc::clone(&state.sessions).run_sweeper(
        Duration::from_secs(config.session.sweep_interval_seconds),
        shutdown.clone(),
    ));

    let app = create_app(state);
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    shutdown.cancel();
    let _ = consumer_task.await;
    let _ = sweeper_task.await;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::sync::list_sync_log,
        crate::handlers::sync::sync_statistics,
        crate::handlers::sync::list_pending,
        crate::handlers::sync::retry_sync,
        crate::handlers::sync::trigger_inventory_pull,
        crate::handlers::sync::create_inventory_adjustment,
        crate::handlers::sync::sync_customer,
        crate::handlers::sync::append_event,
        crate::handlers::config::get_config,
        crate::handlers::config::put_config,
        crate::handlers::mappings::list_item_mappings,
        crate::handlers::mappings::upsert_item_mapping,
        crate::handlers::mappings::list_customer_mappings,
        crate::handlers::mappings::upsert_customer_mapping,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::repositories::SyncStatistics,
            crate::handlers::sync::SyncLogEntryView,
            crate::handlers::sync::InventoryAdjustmentRequest,
            crate::handlers::sync::CustomerSyncRequest,
            crate::handlers::sync::AppendEventRequest,
            crate::handlers::config::ConfigView,
            crate::handlers::config::ConfigUpdateRequest,
            crate::handlers::mappings::ItemMappingView,
            crate::handlers::mappings::ItemMappingUpsertRequest,
            crate::handlers::mappings::CustomerMappingView,
            crate::handlers::mappings::CustomerMappingUpsertRequest,
        )
    ),
    info(
        title = "QuickBooks Web Connector Bridge",
        description = "Bridge between hotel sales/inventory and QuickBooks POS via the Web Connector protocol",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
