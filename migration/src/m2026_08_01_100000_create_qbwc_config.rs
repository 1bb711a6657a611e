//! Migration to create the qbwc_config table.
//!
//! Singleton configuration row for the Web Connector bridge: sync flags,
//! connector credentials (password stored as a SHA-256 hex digest), and the
//! last inventory sync watermark.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QbwcConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QbwcConfig::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(QbwcConfig::SyncEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(QbwcConfig::SyncSales)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(QbwcConfig::SyncInventory)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(QbwcConfig::QbwcUsername).text().not_null())
                    .col(
                        ColumnDef::new(QbwcConfig::QbwcPasswordHash)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QbwcConfig::CompanyFile).text().null())
                    .col(
                        ColumnDef::new(QbwcConfig::LastInventorySync)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(QbwcConfig::ConnectionStatus)
                            .text()
                            .not_null()
                            .default("never_connected"),
                    )
                    .col(
                        ColumnDef::new(QbwcConfig::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(QbwcConfig::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QbwcConfig::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QbwcConfig {
    Table,
    Id,
    SyncEnabled,
    SyncSales,
    SyncInventory,
    QbwcUsername,
    QbwcPasswordHash,
    CompanyFile,
    LastInventorySync,
    ConnectionStatus,
    CreatedAt,
    UpdatedAt,
}
