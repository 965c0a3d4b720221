//! Create `service_requests` table linking customer, service and the
//! optionally assigned professional.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceRequests::Table)
                    .if_not_exists()
                    .col(pk_auto(ServiceRequests::Id))
                    .col(integer(ServiceRequests::CustomerId).not_null())
                    .col(integer(ServiceRequests::ServiceId).not_null())
                    .col(integer_null(ServiceRequests::ProfessionalId))
                    .col(string_len(ServiceRequests::Status, 20).not_null().default("pending"))
                    .col(text(ServiceRequests::Address).not_null())
                    .col(date(ServiceRequests::PreferredDate).not_null())
                    .col(text_null(ServiceRequests::Notes))
                    .col(double_null(ServiceRequests::FinalPrice))
                    .col(timestamp_with_time_zone(ServiceRequests::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ServiceRequests::UpdatedAt).not_null())
                    .col(timestamp_with_time_zone_null(ServiceRequests::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_request_customer")
                            .from(ServiceRequests::Table, ServiceRequests::CustomerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_request_service")
                            .from(ServiceRequests::Table, ServiceRequests::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_request_professional")
                            .from(ServiceRequests::Table, ServiceRequests::ProfessionalId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServiceRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceRequests {
    Table,
    Id,
    CustomerId,
    ServiceId,
    ProfessionalId,
    Status,
    Address,
    PreferredDate,
    Notes,
    FinalPrice,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum Users { Table, Id }

#[derive(DeriveIden)]
enum Services { Table, Id }
