//! JSON response shapes shared by the HTTP layer.
//!
//! Entities never leave the service crate as-is: these views drop credentials,
//! null out professional-only fields for other roles, and inline the related
//! service / customer / professional / review of a request.

use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use utoipa::ToSchema;

use models::catalog;
use models::review;
use models::service_request::{self, RequestStatus};
use models::user::{self, Role};

use crate::errors::ServiceError;

/// Full user view (`/me`, admin listings).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[schema(value_type = String)]
    pub role: Role,
    pub is_active: bool,
    pub is_approved: bool,
    #[schema(value_type = String)]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = Option<String>)]
    pub last_login: Option<DateTimeWithTimeZone>,
    pub login_count: i32,
    pub services: Option<Vec<String>>,
    pub experience: Option<i32>,
    pub about: Option<String>,
    pub average_rating: Option<f64>,
    pub total_jobs: Option<i32>,
}

impl From<&user::Model> for UserView {
    fn from(u: &user::Model) -> Self {
        let pro = u.role == Role::Professional;
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            role: u.role,
            is_active: u.is_active,
            is_approved: u.is_approved,
            created_at: u.created_at,
            last_login: u.last_login,
            login_count: u.login_count,
            services: pro.then(|| u.services_list()),
            experience: if pro { u.experience } else { None },
            about: if pro { u.about.clone() } else { None },
            average_rating: pro.then_some(u.average_rating),
            total_jobs: pro.then_some(u.total_jobs),
        }
    }
}

/// Compact user returned alongside tokens.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[schema(value_type = String)]
    pub role: Role,
    pub is_approved: bool,
}

impl From<&user::Model> for UserSummary {
    fn from(u: &user::Model) -> Self {
        Self { id: u.id, name: u.name.clone(), email: u.email.clone(), role: u.role, is_approved: u.is_approved }
    }
}

/// Public directory entry for a professional.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfessionalPublic {
    pub id: i32,
    pub name: String,
    pub services: Vec<String>,
    pub experience: Option<i32>,
    pub about: Option<String>,
    pub average_rating: f64,
    pub total_jobs: i32,
}

impl From<&user::Model> for ProfessionalPublic {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            services: u.services_list(),
            experience: u.experience,
            about: u.about.clone(),
            average_rating: u.average_rating,
            total_jobs: u.total_jobs,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceView {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub base_price: f64,
    pub image_url: Option<String>,
    pub is_active: bool,
    #[schema(value_type = String)]
    pub created_at: DateTimeWithTimeZone,
    pub average_rating: f64,
}

impl ServiceView {
    pub fn new(s: &catalog::Model, average_rating: f64) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            category: s.category.clone(),
            description: s.description.clone(),
            base_price: s.base_price,
            image_url: s.image_url.clone(),
            is_active: s.is_active,
            created_at: s.created_at,
            average_rating,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceBrief {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub base_price: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PartyView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<&user::Model> for PartyView {
    fn from(u: &user::Model) -> Self {
        Self { id: u.id, name: u.name.clone(), email: u.email.clone(), phone: u.phone.clone() }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReviewView {
    pub id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    #[schema(value_type = String)]
    pub created_at: DateTimeWithTimeZone,
}

impl From<&review::Model> for ReviewView {
    fn from(r: &review::Model) -> Self {
        Self { id: r.id, rating: r.rating, comment: r.comment.clone(), created_at: r.created_at }
    }
}

/// A service request with its related rows inlined.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestDetail {
    pub id: i32,
    #[schema(value_type = String)]
    pub status: RequestStatus,
    pub address: String,
    #[schema(value_type = String, format = Date)]
    pub preferred_date: NaiveDate,
    pub notes: Option<String>,
    pub final_price: Option<f64>,
    #[schema(value_type = String)]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String)]
    pub updated_at: DateTimeWithTimeZone,
    #[schema(value_type = Option<String>)]
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub service: Option<ServiceBrief>,
    pub customer: Option<PartyView>,
    pub professional: Option<PartyView>,
    pub review: Option<ReviewView>,
}

/// Load services, users and reviews for `rows` in three batched queries and
/// assemble details in the original order.
pub async fn request_details<C: ConnectionTrait>(
    db: &C,
    rows: Vec<service_request::Model>,
) -> Result<Vec<RequestDetail>, ServiceError> {
    if rows.is_empty() {
        return Ok(vec![]);
    }
    let service_ids: Vec<i32> = rows.iter().map(|r| r.service_id).collect();
    let user_ids: Vec<i32> = rows
        .iter()
        .flat_map(|r| std::iter::once(r.customer_id).chain(r.professional_id))
        .collect();
    let request_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

    let services: HashMap<i32, catalog::Model> = catalog::Entity::find()
        .filter(catalog::Column::Id.is_in(service_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let reviews: HashMap<i32, review::Model> = review::Entity::find()
        .filter(review::Column::ServiceRequestId.is_in(request_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.service_request_id, r))
        .collect();

    Ok(rows
        .into_iter()
        .map(|r| RequestDetail {
            id: r.id,
            status: r.status,
            address: r.address,
            preferred_date: r.preferred_date,
            notes: r.notes,
            final_price: r.final_price,
            created_at: r.created_at,
            updated_at: r.updated_at,
            completed_at: r.completed_at,
            service: services.get(&r.service_id).map(|s| ServiceBrief {
                id: s.id,
                name: s.name.clone(),
                category: s.category.clone(),
                base_price: s.base_price,
            }),
            customer: users.get(&r.customer_id).map(PartyView::from),
            professional: r.professional_id.and_then(|id| users.get(&id)).map(PartyView::from),
            review: reviews.get(&r.id).map(ReviewView::from),
        })
        .collect())
}

pub async fn request_detail<C: ConnectionTrait>(
    db: &C,
    row: service_request::Model,
) -> Result<RequestDetail, ServiceError> {
    request_details(db, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("service request"))
}
