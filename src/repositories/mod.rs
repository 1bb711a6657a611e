//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access.

pub mod customer_mapping;
pub mod domain_event;
pub mod item_mapping;
pub mod qbwc_config;
pub mod sync_log;

pub use customer_mapping::CustomerMappingRepository;
pub use domain_event::DomainEventRepository;
pub use item_mapping::ItemMappingRepository;
pub use qbwc_config::{ConfigUpdate, QbwcConfigRepository};
pub use sync_log::{NewSyncLogEntry, SyncLogRepository, SyncStatistics};
