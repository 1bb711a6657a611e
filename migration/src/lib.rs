//! Database migrations for the QBWC sync bridge.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_08_01_100000_create_qbwc_config;
mod m2026_08_01_100100_create_item_mappings;
mod m2026_08_01_100200_create_customer_mappings;
mod m2026_08_01_100300_create_sync_log;
mod m2026_08_01_100400_create_domain_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_08_01_100000_create_qbwc_config::Migration),
            Box::new(m2026_08_01_100100_create_item_mappings::Migration),
            Box::new(m2026_08_01_100200_create_customer_mappings::Migration),
            Box::new(m2026_08_01_100300_create_sync_log::Migration),
            Box::new(m2026_08_01_100400_create_domain_events::Migration),
        ]
    }
}
