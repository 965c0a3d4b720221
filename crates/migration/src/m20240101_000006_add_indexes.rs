use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEXES: &[(&str, Tbl, Col)] = &[
    ("idx_service_request_customer", Tbl::ServiceRequests, Col::CustomerId),
    ("idx_service_request_professional", Tbl::ServiceRequests, Col::ProfessionalId),
    ("idx_service_request_status", Tbl::ServiceRequests, Col::Status),
    ("idx_review_professional", Tbl::Reviews, Col::ProfessionalId),
    ("idx_user_role", Tbl::Users, Col::Role),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, col) in INDEXES {
            manager
                .create_index(
                    Index::create()
                        .name(*name)
                        .table(*table)
                        .col(*col)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, _) in INDEXES.iter().rev() {
            manager
                .drop_index(Index::drop().name(*name).table(*table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum Tbl {
    #[sea_orm(iden = "users")]
    Users,
    #[sea_orm(iden = "service_requests")]
    ServiceRequests,
    #[sea_orm(iden = "reviews")]
    Reviews,
}

#[derive(DeriveIden, Clone, Copy)]
enum Col { CustomerId, ProfessionalId, Status, Role }
