//! Migration to create the customer_mappings table.
//!
//! Maps a hotel user to a QuickBooks customer ListID. Optional: sales without
//! a mapping fall back to the generic walk-in customer.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomerMappings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerMappings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CustomerMappings::HotelUserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerMappings::QbCustomerListId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerMappings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CustomerMappings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customer_mappings_hotel_user")
                    .table(CustomerMappings::Table)
                    .col(CustomerMappings::HotelUserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_mappings_hotel_user")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(CustomerMappings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CustomerMappings {
    Table,
    Id,
    HotelUserId,
    QbCustomerListId,
    CreatedAt,
    UpdatedAt,
}
