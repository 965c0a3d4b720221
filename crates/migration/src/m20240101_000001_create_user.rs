//! Create `users` table.
//!
//! One table for every role; professional-only columns are nullable.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Name, 100).not_null())
                    .col(string_len(Users::Email, 120).unique_key().not_null())
                    .col(string_len_null(Users::Phone, 20))
                    .col(string_len(Users::Role, 20).not_null().default("customer"))
                    .col(boolean(Users::IsActive).not_null().default(true))
                    .col(boolean(Users::IsApproved).not_null().default(true))
                    .col(timestamp_with_time_zone(Users::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Users::UpdatedAt).not_null())
                    .col(timestamp_with_time_zone_null(Users::LastLogin))
                    .col(integer(Users::LoginCount).not_null().default(0))
                    .col(text_null(Users::Services))
                    .col(integer_null(Users::Experience))
                    .col(text_null(Users::About))
                    .col(double(Users::AverageRating).not_null().default(0.0))
                    .col(integer(Users::TotalJobs).not_null().default(0))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Role,
    IsActive,
    IsApproved,
    CreatedAt,
    UpdatedAt,
    LastLogin,
    LoginCount,
    Services,
    Experience,
    About,
    AverageRating,
    TotalJobs,
}
