//! # Data Models
//!
//! This module contains all the data models used throughout the sync bridge.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod customer_mapping;
pub mod domain_event;
pub mod item_mapping;
pub mod qbwc_config;
pub mod sync_log;

pub use customer_mapping::Entity as CustomerMapping;
pub use domain_event::Entity as DomainEvent;
pub use item_mapping::Entity as ItemMapping;
pub use qbwc_config::Entity as QbwcConfig;
pub use sync_log::Entity as SyncLog;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "qbwc-bridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
