use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use super::setup_test_db;
use crate::catalog::{self, NewService};
use crate::errors::ModelError;
use crate::review;
use crate::service_request::{self, NewServiceRequest, RequestStatus};
use crate::user::{self, NewUser, Role};
use crate::user_credentials;

fn customer(email: &str) -> NewUser {
    NewUser { name: "Carol".into(), email: email.into(), role: Role::Customer, ..Default::default() }
}

fn professional(email: &str, services: &[&str]) -> NewUser {
    NewUser {
        name: "Pete".into(),
        email: email.into(),
        role: Role::Professional,
        services: services.iter().map(|s| s.to_string()).collect(),
        experience: Some(4),
        about: Some("tidy".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_user_create_defaults_by_role() -> Result<()> {
    let db = setup_test_db().await?;

    let c = user::create(&db, customer("Carol@Example.com")).await?;
    assert_eq!(c.email, "carol@example.com");
    assert!(c.is_approved);
    assert!(c.is_active);
    assert_eq!(c.login_count, 0);
    assert!(c.services.is_none());

    let p = user::create(&db, professional("pete@example.com", &["Plumbing", "Painting"])).await?;
    assert!(!p.is_approved);
    assert_eq!(p.services_list(), vec!["Plumbing".to_string(), "Painting".to_string()]);
    assert!(p.offers("Plumbing"));
    assert!(!p.offers("plumbing"));
    assert_eq!(p.average_rating, 0.0);

    let found = user::find_by_email(&db, " PETE@example.com ").await?;
    assert_eq!(found.map(|u| u.id), Some(p.id));
    Ok(())
}

#[tokio::test]
async fn test_user_validation_and_unique_email() -> Result<()> {
    let db = setup_test_db().await?;
    let bad = user::create(&db, customer("no-at-sign")).await;
    assert!(matches!(bad, Err(ModelError::Validation(_))));

    let blank = user::create(&db, NewUser { name: "  ".into(), email: "x@y.z".into(), ..Default::default() }).await;
    assert!(matches!(blank, Err(ModelError::Validation(_))));

    user::create(&db, customer("dup@example.com")).await?;
    let dup = user::create(&db, customer("dup@example.com")).await;
    assert!(matches!(dup, Err(ModelError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn test_record_login_increments_counter() -> Result<()> {
    let db = setup_test_db().await?;
    let u = user::create(&db, customer("login@example.com")).await?;
    let u = user::record_login(&db, u).await?;
    let u = user::record_login(&db, u).await?;
    assert_eq!(u.login_count, 2);
    assert!(u.last_login.is_some());
    Ok(())
}

#[tokio::test]
async fn test_credentials_upsert_replaces_hash() -> Result<()> {
    let db = setup_test_db().await?;
    let u = user::create(&db, customer("cred@example.com")).await?;

    user_credentials::upsert_password(&db, u.id, "hash-1".into(), "argon2").await?;
    user_credentials::upsert_password(&db, u.id, "hash-2".into(), "argon2").await?;
    assert_eq!(user_credentials::Entity::find().all(&db).await?.len(), 1);

    let stored = user_credentials::Entity::find().one(&db).await?.map(|c| c.password_hash);
    assert_eq!(stored.as_deref(), Some("hash-2"));

    let empty = user_credentials::upsert_password(&db, u.id, " ".into(), "argon2").await;
    assert!(matches!(empty, Err(ModelError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn test_service_and_request_create() -> Result<()> {
    let db = setup_test_db().await?;
    let c = user::create(&db, customer("req@example.com")).await?;
    let s = catalog::create(
        &db,
        NewService { name: "Plumbing".into(), category: "Repair".into(), base_price: 80.0, ..Default::default() },
    )
    .await?;
    assert!(s.is_active);

    let negative = catalog::create(
        &db,
        NewService { name: "Bad".into(), category: "Repair".into(), base_price: -1.0, ..Default::default() },
    )
    .await;
    assert!(matches!(negative, Err(ModelError::Validation(_))));

    let date = service_request::parse_date("2024-05-17")?;
    let r = service_request::create(
        &db,
        NewServiceRequest {
            customer_id: c.id,
            service_id: s.id,
            professional_id: None,
            address: "1 Main St".into(),
            preferred_date: date,
            notes: Some("side door".into()),
            final_price: None,
        },
    )
    .await?;
    assert_eq!(r.status, RequestStatus::Pending);
    assert_eq!(r.preferred_date, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());

    let mut am: service_request::ActiveModel = r.into();
    am.status = Set(RequestStatus::Completed);
    let updated = am.update(&db).await?;
    let reloaded = service_request::Entity::find_by_id(updated.id).one(&db).await?.unwrap();
    assert_eq!(reloaded.status, RequestStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_review_upsert_and_average() -> Result<()> {
    let db = setup_test_db().await?;
    let c = user::create(&db, customer("rev@example.com")).await?;
    let p = user::create(&db, professional("pro@example.com", &["Cleaning"])).await?;
    let s = catalog::create(
        &db,
        NewService { name: "Cleaning".into(), category: "Home".into(), base_price: 40.0, ..Default::default() },
    )
    .await?;
    let mut request_ids = vec![];
    for _ in 0..2 {
        let r = service_request::create(
            &db,
            NewServiceRequest {
                customer_id: c.id,
                service_id: s.id,
                professional_id: Some(p.id),
                address: "2 Side St".into(),
                preferred_date: service_request::parse_date("2024-06-01")?,
                notes: None,
                final_price: None,
            },
        )
        .await?;
        request_ids.push(r.id);
    }

    assert_eq!(review::average_for_professional(&db, p.id).await?, 0.0);

    review::upsert_for_request(&db, c.id, p.id, request_ids[0], 2, None).await?;
    review::upsert_for_request(&db, c.id, p.id, request_ids[0], 4, Some("better".into())).await?;
    review::upsert_for_request(&db, c.id, p.id, request_ids[1], 5, None).await?;
    assert_eq!(review::Entity::find().all(&db).await?.len(), 2);
    assert_eq!(review::average_for_professional(&db, p.id).await?, 4.5);

    let out_of_range = review::upsert_for_request(&db, c.id, p.id, request_ids[1], 6, None).await;
    assert!(matches!(out_of_range, Err(ModelError::Validation(_))));
    Ok(())
}

#[test]
fn test_enum_parsing() {
    assert_eq!(Role::parse("Professional"), Some(Role::Professional));
    assert_eq!(Role::parse("root"), None);
    assert_eq!(RequestStatus::parse(" cancelled "), Some(RequestStatus::Cancelled));
    assert_eq!(RequestStatus::parse("done"), None);
    assert!(RequestStatus::Pending.is_open());
    assert!(RequestStatus::Accepted.is_open());
    assert!(!RequestStatus::Completed.is_open());
    assert_eq!(serde_json::to_string(&RequestStatus::Rejected).unwrap(), "\"rejected\"");
    assert!(service_request::parse_date("17/05/2024").is_err());
    assert_eq!(review::average(&[]), 0.0);
    assert_eq!(review::average(&[1, 2]), 1.5);
}
