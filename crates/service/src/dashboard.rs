//! Dashboard aggregates for each role.
use std::time::Duration;

use moka::future::Cache;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use models::catalog;
use models::service_request::{self, RequestStatus};
use models::user::{self, Role};

use crate::errors::ServiceError;
use crate::views::{request_details, RequestDetail, ServiceView, UserView};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_professionals: u64,
    pub total_customers: u64,
    pub total_services: u64,
    pub total_requests: u64,
    pub pending_requests: u64,
    pub completed_requests: u64,
}

pub async fn admin_stats(db: &DatabaseConnection) -> Result<AdminStats, ServiceError> {
    let users_with = |role: Role| user::Entity::find().filter(user::Column::Role.eq(role)).count(db);
    let requests_with =
        |status: RequestStatus| service_request::Entity::find().filter(service_request::Column::Status.eq(status)).count(db);
    Ok(AdminStats {
        total_users: user::Entity::find().count(db).await?,
        total_professionals: users_with(Role::Professional).await?,
        total_customers: users_with(Role::Customer).await?,
        total_services: catalog::Entity::find().count(db).await?,
        total_requests: service_request::Entity::find().count(db).await?,
        pending_requests: requests_with(RequestStatus::Pending).await?,
        completed_requests: requests_with(RequestStatus::Completed).await?,
    })
}

/// TTL cache in front of `admin_stats`; admin mutations call `invalidate`.
#[derive(Clone)]
pub struct DashboardCache {
    inner: Cache<&'static str, AdminStats>,
}

const ADMIN_KEY: &str = "admin_dashboard";

impl DashboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Cache::builder().max_capacity(16).time_to_live(ttl).build() }
    }

    pub async fn admin_stats(&self, db: &DatabaseConnection) -> Result<AdminStats, ServiceError> {
        if let Some(hit) = self.inner.get(ADMIN_KEY).await {
            return Ok(hit);
        }
        let fresh = admin_stats(db).await?;
        self.inner.insert(ADMIN_KEY, fresh.clone()).await;
        Ok(fresh)
    }

    pub async fn invalidate(&self) {
        self.inner.invalidate(ADMIN_KEY).await;
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerDashboardStats {
    pub active_requests: usize,
    pub completed_requests: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerDashboard {
    pub user: UserView,
    pub stats: CustomerDashboardStats,
    pub active_requests: Vec<RequestDetail>,
    pub completed_requests: Vec<RequestDetail>,
    pub services: Vec<ServiceView>,
}

pub async fn customer_dashboard(db: &DatabaseConnection, customer: &user::Model) -> Result<CustomerDashboard, ServiceError> {
    let mine = crate::requests::list_for_customer(db, customer.id, None).await?;
    let (active, rest): (Vec<_>, Vec<_>) = mine.into_iter().partition(|r| r.status.is_open());
    let completed: Vec<_> = rest.into_iter().filter(|r| r.status == RequestStatus::Completed).collect();

    let featured = catalog::Entity::find()
        .filter(catalog::Column::IsActive.eq(true))
        .order_by_asc(catalog::Column::Id)
        .limit(5)
        .all(db)
        .await?;
    let ratings = crate::catalog::ratings_by_service(db).await?;

    Ok(CustomerDashboard {
        user: UserView::from(customer),
        stats: CustomerDashboardStats { active_requests: active.len(), completed_requests: completed.len() },
        active_requests: request_details(db, active).await?,
        completed_requests: request_details(db, completed).await?,
        services: featured
            .iter()
            .map(|s| ServiceView::new(s, ratings.get(&s.id).copied().unwrap_or(0.0)))
            .collect(),
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerStats {
    pub total_requests: u64,
    pub completed_services: u64,
    pub reviews_given: u64,
}

pub async fn customer_stats(db: &DatabaseConnection, customer_id: i32) -> Result<CustomerStats, ServiceError> {
    let mine = service_request::Entity::find().filter(service_request::Column::CustomerId.eq(customer_id));
    Ok(CustomerStats {
        total_requests: mine.clone().count(db).await?,
        completed_services: mine
            .filter(service_request::Column::Status.eq(RequestStatus::Completed))
            .count(db)
            .await?,
        reviews_given: crate::reviews::count_by_customer(db, customer_id).await?,
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfessionalDashboardStats {
    pub total_jobs: i32,
    pub average_rating: f64,
    pub pending_requests: usize,
    pub active_requests: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfessionalDashboard {
    pub user: UserView,
    pub stats: ProfessionalDashboardStats,
    pub pending_requests: Vec<RequestDetail>,
    pub accepted_requests: Vec<RequestDetail>,
    pub completed_requests: Vec<RequestDetail>,
}

pub async fn professional_dashboard(
    db: &DatabaseConnection,
    professional: &user::Model,
) -> Result<ProfessionalDashboard, ServiceError> {
    let assigned = crate::requests::assigned_to(db, professional.id, None).await?;
    let by = |status: RequestStatus| -> Vec<service_request::Model> {
        assigned.iter().filter(|r| r.status == status).cloned().collect()
    };
    let pending = by(RequestStatus::Pending);
    let accepted = by(RequestStatus::Accepted);
    let completed = by(RequestStatus::Completed);

    Ok(ProfessionalDashboard {
        user: UserView::from(professional),
        stats: ProfessionalDashboardStats {
            total_jobs: professional.total_jobs,
            average_rating: professional.average_rating,
            pending_requests: pending.len(),
            active_requests: accepted.len(),
        },
        pending_requests: request_details(db, pending).await?,
        accepted_requests: request_details(db, accepted).await?,
        completed_requests: request_details(db, completed).await?,
    })
}
