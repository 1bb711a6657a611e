//! Migration to create the item_mappings table.
//!
//! Maps a hotel-side item (id + type) to its QuickBooks ListID/FullName.
//! A mapping must exist before the item can appear in QBXML.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ItemMappings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ItemMappings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ItemMappings::HotelItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(ItemMappings::HotelItemType)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ItemMappings::QbListId).text().not_null())
                    .col(ColumnDef::new(ItemMappings::QbFullName).text().not_null())
                    .col(
                        ColumnDef::new(ItemMappings::SyncInventory)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ItemMappings::QuantityOnHand)
                            .double()
                            .null(),
                    )
                    .col(ColumnDef::new(ItemMappings::AverageCost).double().null())
                    .col(
                        ColumnDef::new(ItemMappings::QuantityUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ItemMappings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ItemMappings::UpdatedAt)
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
                    .name("idx_item_mappings_hotel_item")
                    .table(ItemMappings::Table)
                    .col(ItemMappings::HotelItemId)
                    .col(ItemMappings::HotelItemType)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_item_mappings_hotel_item")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ItemMappings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ItemMappings {
    Table,
    Id,
    HotelItemId,
    HotelItemType,
    QbListId,
    QbFullName,
    SyncInventory,
    QuantityOnHand,
    AverageCost,
    QuantityUpdatedAt,
    CreatedAt,
    UpdatedAt,
}
