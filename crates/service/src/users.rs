//! User profile management and the admin user/professional console.
use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};

use models::user::{self, Role};
use models::{review, service_request, user_credentials};

use crate::{errors::ServiceError, pagination::Pagination};

/// Self-service profile edit. Professional-only fields are ignored for other roles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub services: Option<Vec<String>>,
    pub experience: Option<i32>,
    pub about: Option<String>,
}

/// Admin edit of any user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub is_approved: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfessionalAction {
    Approve,
    Block,
    Unblock,
}

/// Get a user by id.
pub async fn get(db: &DatabaseConnection, id: i32) -> Result<user::Model, ServiceError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))
}

#[instrument(skip(db, update), fields(user_id = id))]
pub async fn update_profile(db: &DatabaseConnection, id: i32, update: ProfileUpdate) -> Result<user::Model, ServiceError> {
    let found = get(db, id).await?;
    let is_professional = found.role == Role::Professional;
    let mut am: user::ActiveModel = found.into();
    if let Some(name) = update.name {
        user::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(phone) = update.phone {
        am.phone = Set(Some(phone).filter(|p| !p.trim().is_empty()));
    }
    if is_professional {
        if let Some(services) = update.services {
            let cleaned: Vec<String> = services.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
            am.services = Set(user::encode_services(&cleaned));
        }
        if let Some(exp) = update.experience {
            if exp < 0 {
                return Err(ServiceError::validation("experience must be >= 0"));
            }
            am.experience = Set(Some(exp));
        }
        if let Some(about) = update.about {
            am.about = Set(Some(about));
        }
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

#[instrument(skip(db, update), fields(user_id = id))]
pub async fn admin_update(db: &DatabaseConnection, id: i32, update: AdminUserUpdate) -> Result<user::Model, ServiceError> {
    let found = get(db, id).await?;
    let mut am: user::ActiveModel = found.clone().into();
    if let Some(name) = update.name {
        user::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(email) = update.email {
        user::validate_email(&email)?;
        let email = email.trim().to_lowercase();
        if email != found.email && user::find_by_email(db, &email).await?.is_some() {
            return Err(ServiceError::Conflict("email already registered".into()));
        }
        am.email = Set(email);
    }
    if let Some(phone) = update.phone {
        am.phone = Set(Some(phone).filter(|p| !p.trim().is_empty()));
    }
    if let Some(role) = update.role {
        let role = Role::parse(&role).ok_or_else(|| ServiceError::validation(format!("invalid role: {}", role)))?;
        am.role = Set(role);
    }
    if let Some(approved) = update.is_approved {
        am.is_approved = Set(approved);
    }
    if let Some(active) = update.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(user_id = id, event = "user_updated", "admin updated user");
    Ok(updated)
}

/// Delete a user together with their credentials, reviews and own requests;
/// requests they were assigned to as professional become unassigned.
#[instrument(skip(db), fields(user_id = id))]
pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    get(db, id).await?;
    let txn = db.begin().await?;

    let own_requests: Vec<i32> = service_request::Entity::find()
        .filter(service_request::Column::CustomerId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    let doomed_reviews = review::Column::UserId
        .eq(id)
        .or(review::Column::ProfessionalId.eq(id))
        .or(review::Column::ServiceRequestId.is_in(own_requests));
    let rated: BTreeSet<i32> = review::Entity::find()
        .filter(doomed_reviews.clone())
        .all(&txn)
        .await?
        .into_iter()
        .map(|r| r.professional_id)
        .filter(|pid| *pid != id)
        .collect();
    review::Entity::delete_many().filter(doomed_reviews).exec(&txn).await?;
    for pid in rated {
        crate::reviews::recompute_average(&txn, pid).await?;
    }
    service_request::Entity::delete_many()
        .filter(service_request::Column::CustomerId.eq(id))
        .exec(&txn)
        .await?;
    service_request::Entity::update_many()
        .col_expr(service_request::Column::ProfessionalId, sea_orm::sea_query::Expr::value(Option::<i32>::None))
        .filter(service_request::Column::ProfessionalId.eq(id))
        .exec(&txn)
        .await?;
    user_credentials::Entity::delete_many()
        .filter(user_credentials::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    user::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    info!(user_id = id, event = "user_deleted", "user deleted");
    Ok(())
}

/// Flip `is_approved`.
pub async fn toggle_approval(db: &DatabaseConnection, id: i32) -> Result<user::Model, ServiceError> {
    let found = get(db, id).await?;
    let next = !found.is_approved;
    let mut am: user::ActiveModel = found.into();
    am.is_approved = Set(next);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

#[instrument(skip(db), fields(user_id = id))]
pub async fn moderate_professional(
    db: &DatabaseConnection,
    id: i32,
    action: ProfessionalAction,
) -> Result<user::Model, ServiceError> {
    let found = get(db, id).await?;
    if found.role != Role::Professional {
        return Err(ServiceError::validation("user is not a professional"));
    }
    let mut am: user::ActiveModel = found.into();
    match action {
        ProfessionalAction::Approve => am.is_approved = Set(true),
        ProfessionalAction::Block => am.is_active = Set(false),
        ProfessionalAction::Unblock => am.is_active = Set(true),
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(user_id = id, action = ?action, event = "professional_moderated", "professional status changed");
    Ok(updated)
}

/// List users, optionally by role, newest first. Returns the page and the total count.
pub async fn list(
    db: &DatabaseConnection,
    role: Option<Role>,
    opts: Pagination,
) -> Result<(Vec<user::Model>, u64), ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut query = user::Entity::find().order_by_desc(user::Column::CreatedAt).order_by_desc(user::Column::Id);
    if let Some(role) = role {
        query = query.filter(user::Column::Role.eq(role));
    }
    let paginator = query.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let users = paginator.fetch_page(page_idx).await?;
    Ok((users, total))
}

pub async fn list_professionals(db: &DatabaseConnection) -> Result<Vec<user::Model>, ServiceError> {
    Ok(user::Entity::find()
        .filter(user::Column::Role.eq(Role::Professional))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?)
}

/// Professionals still waiting for approval.
pub async fn pending_professionals(db: &DatabaseConnection) -> Result<Vec<user::Model>, ServiceError> {
    Ok(user::Entity::find()
        .filter(user::Column::Role.eq(Role::Professional))
        .filter(user::Column::IsApproved.eq(false))
        .order_by_asc(user::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Approved, active professionals: the public directory.
pub async fn approved_professionals(db: &DatabaseConnection) -> Result<Vec<user::Model>, ServiceError> {
    Ok(user::Entity::find()
        .filter(user::Column::Role.eq(Role::Professional))
        .filter(user::Column::IsApproved.eq(true))
        .filter(user::Column::IsActive.eq(true))
        .order_by_desc(user::Column::AverageRating)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?)
}

/// Approved professionals offering the named catalog service.
pub async fn professionals_for_service(db: &DatabaseConnection, service_id: i32) -> Result<Vec<user::Model>, ServiceError> {
    let service = models::catalog::Entity::find_by_id(service_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    Ok(approved_professionals(db)
        .await?
        .into_iter()
        .filter(|p| p.offers(&service.name))
        .collect())
}

/// Case-insensitive name/email substring match plus optional exact service membership.
pub async fn search_professionals(
    db: &DatabaseConnection,
    q: Option<&str>,
    service_type: Option<&str>,
) -> Result<Vec<user::Model>, ServiceError> {
    let needle = q.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    let service_type = service_type.map(str::trim).filter(|s| !s.is_empty());
    Ok(list_professionals(db)
        .await?
        .into_iter()
        .filter(|p| match &needle {
            Some(n) => p.name.to_lowercase().contains(n) || p.email.to_lowercase().contains(n),
            None => true,
        })
        .filter(|p| match service_type {
            Some(st) => p.services_list().iter().any(|s| s.eq_ignore_ascii_case(st)),
            None => true,
        })
        .collect())
}
