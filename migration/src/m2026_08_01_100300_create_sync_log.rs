//! Migration to create the sync_log table.
//!
//! Durable journal of every QuickBooks sync attempt: the pending queue drained
//! by Web Connector polling cycles and the audit trail for the admin dashboard.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncLog::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncLog::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncLog::SyncType).text().not_null())
                    .col(ColumnDef::new(SyncLog::Direction).text().not_null())
                    .col(ColumnDef::new(SyncLog::ReferenceType).text().not_null())
                    .col(ColumnDef::new(SyncLog::ReferenceId).uuid().not_null())
                    .col(ColumnDef::new(SyncLog::QbxmlRequest).text().null())
                    .col(ColumnDef::new(SyncLog::QbxmlResponse).text().null())
                    .col(
                        ColumnDef::new(SyncLog::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SyncLog::QbTransactionId).text().null())
                    .col(ColumnDef::new(SyncLog::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(SyncLog::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncLog::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncLog::SyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Pending-queue drain order is (status, created_at ASC)
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_log_status_created")
                    .table(SyncLog::Table)
                    .col(SyncLog::Status)
                    .col(SyncLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_log_reference")
                    .table(SyncLog::Table)
                    .col(SyncLog::ReferenceType)
                    .col(SyncLog::ReferenceId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_log_status_created").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_sync_log_reference").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncLog {
    Table,
    Id,
    SyncType,
    Direction,
    ReferenceType,
    ReferenceId,
    QbxmlRequest,
    QbxmlResponse,
    Status,
    QbTransactionId,
    ErrorMessage,
    RetryCount,
    CreatedAt,
    UpdatedAt,
    SyncedAt,
}
