//! Create `services` catalog table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(pk_auto(Services::Id))
                    .col(string_len(Services::Name, 100).not_null())
                    .col(string_len(Services::Category, 50).not_null())
                    .col(text_null(Services::Description))
                    .col(double(Services::BasePrice).not_null())
                    .col(string_len_null(Services::ImageUrl, 255))
                    .col(boolean(Services::IsActive).not_null().default(true))
                    .col(timestamp_with_time_zone(Services::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Services::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Services::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Services { Table, Id, Name, Category, Description, BasePrice, ImageUrl, IsActive, CreatedAt, UpdatedAt }
