//! Migration to create the domain_events table.
//!
//! Durable trigger queue between the domain services (orders, bookings) and
//! the sync bridge. Producers append a row; the event consumer loop claims
//! pending rows and queues the corresponding sync, so a sync-preparation
//! failure can never fail the originating business operation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DomainEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DomainEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DomainEvents::Kind).text().not_null())
                    .col(ColumnDef::new(DomainEvents::ReferenceId).uuid().not_null())
                    .col(ColumnDef::new(DomainEvents::Payload).json_binary().null())
                    .col(
                        ColumnDef::new(DomainEvents::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(DomainEvents::Error).text().null())
                    .col(
                        ColumnDef::new(DomainEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DomainEvents::ConsumedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_domain_events_status_created")
                    .table(DomainEvents::Table)
                    .col(DomainEvents::Status)
                    .col(DomainEvents::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_domain_events_status_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DomainEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DomainEvents {
    Table,
    Id,
    Kind,
    ReferenceId,
    Payload,
    Status,
    Error,
    CreatedAt,
    ConsumedAt,
}
