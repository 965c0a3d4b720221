#![cfg(test)]
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use models::user::{self, NewUser, Role};

/// Fresh migrated in-memory database; each test gets its own.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let db = connect_with_config(&DatabaseConfig::in_memory()).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn make_user(db: &DatabaseConnection, email: &str, role: Role, services: &[&str]) -> user::Model {
    user::create(
        db,
        NewUser {
            name: email.split('@').next().unwrap_or("user").to_string(),
            email: email.to_string(),
            role,
            services: services.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
    )
    .await
    .expect("create user")
}

/// Professional that has already been approved by an admin.
pub async fn make_approved_professional(db: &DatabaseConnection, email: &str, services: &[&str]) -> user::Model {
    use sea_orm::{ActiveModelTrait, Set};
    let p = make_user(db, email, Role::Professional, services).await;
    let mut am: user::ActiveModel = p.into();
    am.is_approved = Set(true);
    am.update(db).await.expect("approve professional")
}

pub async fn make_service(db: &DatabaseConnection, name: &str, category: &str, price: f64) -> models::catalog::Model {
    models::catalog::create(
        db,
        models::catalog::NewService { name: name.into(), category: category.into(), base_price: price, ..Default::default() },
    )
    .await
    .expect("create service")
}

pub async fn make_request(
    db: &DatabaseConnection,
    customer_id: i32,
    service_id: i32,
    professional_id: Option<i32>,
) -> models::service_request::Model {
    models::service_request::create(
        db,
        models::service_request::NewServiceRequest {
            customer_id,
            service_id,
            professional_id,
            address: "12 Elm Street".into(),
            preferred_date: chrono::NaiveDate::from_ymd_opt(2024, 7, 1).expect("date"),
            notes: None,
            final_price: None,
        },
    )
    .await
    .expect("create request")
}

/// Force a request into `status` bypassing transition checks.
pub async fn set_status(
    db: &DatabaseConnection,
    req: models::service_request::Model,
    status: models::service_request::RequestStatus,
) -> models::service_request::Model {
    use sea_orm::{ActiveModelTrait, Set};
    let mut am: models::service_request::ActiveModel = req.into();
    am.status = Set(status);
    am.update(db).await.expect("set status")
}
