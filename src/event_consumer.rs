//! # Domain Event Consumer
//!
//! Background loop draining the durable `domain_events` queue. Producers
//! (order and booking services) append a row at their own commit boundary;
//! this consumer picks rows up on a fixed tick and asks the orchestrator to
//! queue the matching QuickBooks work. The queue survives restarts, so a
//! completed order is never lost to a crash between the business event and
//! the sync log entry.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::domain_event::{EventKind, Model as DomainEvent};
use crate::orchestrator::{SyncError, SyncOrchestrator};
use crate::repositories::DomainEventRepository;

/// Consumer loop tuning.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub tick: Duration,
    pub claim_batch: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(5),
            claim_batch: 25,
        }
    }
}

pub struct EventConsumer {
    events: DomainEventRepository,
    orchestrator: Arc<SyncOrchestrator>,
    config: ConsumerConfig,
}

impl EventConsumer {
    pub fn new(
        db: DatabaseConnection,
        orchestrator: Arc<SyncOrchestrator>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            events: DomainEventRepository::new(db),
            orchestrator,
            config,
        }
    }

    /// Run until the shutdown token fires. Each tick claims a batch of
    /// pending events and processes them in order.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_secs = self.config.tick.as_secs(),
            claim_batch = self.config.claim_batch,
            "Event consumer started"
        );
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Event consumer stopped");
                    return;
                }
                _ = tokio::time::sleep(self.config.tick) => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Event consumer tick failed");
                    }
                }
            }
        }
    }

    /// Process one batch. Returns the number of events handled.
    pub async fn tick(&self) -> Result<usize, sea_orm::DbErr> {
        let batch = self.events.claim_pending(self.config.claim_batch).await?;
        if batch.is_empty() {
            return Ok(0);
        }
        debug!(claimed = batch.len(), "Processing domain events");

        let mut handled = 0;
        for event in batch {
            match self.process(&event).await {
                Disposition::Consumed => {
                    self.events.mark_consumed(event.id).await?;
                    handled += 1;
                }
                Disposition::Failed(reason) => {
                    warn!(event_id = %event.id, kind = %event.kind, reason, "Domain event failed");
                    self.events.mark_failed(event.id, &reason).await?;
                    handled += 1;
                }
                Disposition::Deferred(reason) => {
                    // Leave the whole batch pending; nothing downstream will
                    // succeed until the configuration changes.
                    debug!(reason, "Domain event processing deferred");
                    return Ok(handled);
                }
            }
        }
        Ok(handled)
    }

    async fn process(&self, event: &DomainEvent) -> Disposition {
        let Some(kind) = EventKind::parse(&event.kind) else {
            return Disposition::Failed(format!("unknown event kind {}", event.kind));
        };

        let result = match kind {
            EventKind::OrderCompleted => self
                .orchestrator
                .sync_completed_order(event.reference_id)
                .await,
            EventKind::BookingCheckedOut => self
                .orchestrator
                .sync_completed_booking(event.reference_id)
                .await,
        };

        match result {
            Ok(_) => Disposition::Consumed,
            Err(SyncError::Disabled(reason)) => Disposition::Deferred(reason),
            Err(e) => Disposition::Failed(e.to_string()),
        }
    }
}

enum Disposition {
    Consumed,
    Failed(String),
    Deferred(String),
}
