//! Service request lifecycle.
//!
//! `pending` → `accepted` → `completed`, with `cancelled` (customer, from
//! pending or accepted) and `rejected` (professional, from pending) as side
//! exits. Admins may override to any status.
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};

use models::catalog;
use models::service_request::{self, NewServiceRequest, RequestStatus};
use models::user::{self, Role};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestInput {
    pub service_id: i32,
    pub preferred_date: String,
    pub address: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub professional_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRequestInput {
    pub address: Option<String>,
    pub preferred_date: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub professional_id: Option<i32>,
}

/// Which slice of requests a professional is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfessionalQueue {
    /// Requests assigned to the professional in this status.
    Assigned(RequestStatus),
    /// Unassigned pending requests for services the professional offers.
    Open,
}

impl ProfessionalQueue {
    pub fn parse(raw: Option<&str>) -> Result<Self, ServiceError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::Assigned(RequestStatus::Pending)),
            Some(s) if s.eq_ignore_ascii_case("open") => Ok(Self::Open),
            Some(s) => RequestStatus::parse(s)
                .map(Self::Assigned)
                .ok_or_else(|| ServiceError::validation(format!("invalid status: {}", s))),
        }
    }
}

/// `None`, empty and `all` mean no filter.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<RequestStatus>, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all")) {
        None => Ok(None),
        Some(s) => RequestStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ServiceError::validation(format!("invalid status: {}", s))),
    }
}

pub async fn get(db: &DatabaseConnection, id: i32) -> Result<service_request::Model, ServiceError> {
    service_request::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service request"))
}

/// A request owned by `customer_id`; someone else's request reads as missing.
pub async fn get_owned(db: &DatabaseConnection, customer_id: i32, id: i32) -> Result<service_request::Model, ServiceError> {
    let found = get(db, id).await?;
    if found.customer_id != customer_id {
        return Err(ServiceError::not_found("service request"));
    }
    Ok(found)
}

async fn ensure_assignable_professional(db: &DatabaseConnection, professional_id: i32) -> Result<(), ServiceError> {
    let pro = user::Entity::find_by_id(professional_id).one(db).await?;
    match pro {
        Some(p) if p.role == Role::Professional && p.is_approved && p.is_active => Ok(()),
        _ => Err(ServiceError::validation("invalid professional selected")),
    }
}

#[instrument(skip(db, input), fields(service_id = input.service_id))]
pub async fn create_for_customer(
    db: &DatabaseConnection,
    customer_id: i32,
    input: CreateRequestInput,
) -> Result<service_request::Model, ServiceError> {
    let service = catalog::Entity::find_by_id(input.service_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    if !service.is_active {
        return Err(ServiceError::validation("service is not available"));
    }
    let preferred_date = service_request::parse_date(&input.preferred_date)?;
    if let Some(pid) = input.professional_id {
        ensure_assignable_professional(db, pid).await?;
    }
    let created = service_request::create(
        db,
        NewServiceRequest {
            customer_id,
            service_id: service.id,
            professional_id: input.professional_id,
            address: input.address,
            preferred_date,
            notes: input.description.filter(|d| !d.trim().is_empty()),
            final_price: input.price,
        },
    )
    .await?;
    info!(request_id = created.id, customer_id, event = "request_created", "service request created");
    Ok(created)
}

#[instrument(skip(db, input))]
pub async fn update_by_customer(
    db: &DatabaseConnection,
    customer_id: i32,
    id: i32,
    input: UpdateRequestInput,
) -> Result<service_request::Model, ServiceError> {
    let found = get_owned(db, customer_id, id).await?;
    if found.status != RequestStatus::Pending {
        return Err(ServiceError::validation("only pending requests can be edited"));
    }
    let mut am: service_request::ActiveModel = found.into();
    if let Some(address) = input.address {
        if address.trim().is_empty() {
            return Err(ServiceError::validation("address required"));
        }
        am.address = Set(address.trim().to_string());
    }
    if let Some(date) = input.preferred_date {
        am.preferred_date = Set(service_request::parse_date(&date)?);
    }
    if let Some(description) = input.description {
        am.notes = Set(Some(description));
    }
    if let Some(price) = input.price {
        catalog::validate_price(price)?;
        am.final_price = Set(Some(price));
    }
    if let Some(pid) = input.professional_id {
        ensure_assignable_professional(db, pid).await?;
        am.professional_id = Set(Some(pid));
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// A customer's own requests, newest first.
pub async fn list_for_customer(
    db: &DatabaseConnection,
    customer_id: i32,
    status: Option<RequestStatus>,
) -> Result<Vec<service_request::Model>, ServiceError> {
    let mut query = service_request::Entity::find()
        .filter(service_request::Column::CustomerId.eq(customer_id))
        .order_by_desc(service_request::Column::CreatedAt)
        .order_by_desc(service_request::Column::Id);
    if let Some(status) = status {
        query = query.filter(service_request::Column::Status.eq(status));
    }
    Ok(query.all(db).await?)
}

#[instrument(skip(db))]
pub async fn cancel(db: &DatabaseConnection, customer_id: i32, id: i32) -> Result<service_request::Model, ServiceError> {
    let found = get_owned(db, customer_id, id).await?;
    if !found.status.is_open() {
        return Err(ServiceError::validation(format!("cannot cancel a {} request", found.status)));
    }
    let mut am: service_request::ActiveModel = found.into();
    am.status = Set(RequestStatus::Cancelled);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(request_id = id, customer_id, event = "request_cancelled", "service request cancelled");
    Ok(updated)
}

/// Requests assigned to `professional_id` in `status`, newest first.
pub async fn assigned_to(
    db: &DatabaseConnection,
    professional_id: i32,
    status: Option<RequestStatus>,
) -> Result<Vec<service_request::Model>, ServiceError> {
    let mut query = service_request::Entity::find()
        .filter(service_request::Column::ProfessionalId.eq(professional_id))
        .order_by_desc(service_request::Column::CreatedAt)
        .order_by_desc(service_request::Column::Id);
    if let Some(status) = status {
        query = query.filter(service_request::Column::Status.eq(status));
    }
    Ok(query.all(db).await?)
}

pub async fn list_for_professional(
    db: &DatabaseConnection,
    professional: &user::Model,
    queue: ProfessionalQueue,
) -> Result<Vec<service_request::Model>, ServiceError> {
    match queue {
        ProfessionalQueue::Assigned(status) => assigned_to(db, professional.id, Some(status)).await,
        ProfessionalQueue::Open => {
            let offered = professional.services_list();
            if offered.is_empty() {
                return Ok(vec![]);
            }
            let service_ids: Vec<i32> = catalog::Entity::find()
                .filter(catalog::Column::Name.is_in(offered))
                .all(db)
                .await?
                .into_iter()
                .map(|s| s.id)
                .collect();
            Ok(service_request::Entity::find()
                .filter(service_request::Column::Status.eq(RequestStatus::Pending))
                .filter(service_request::Column::ProfessionalId.is_null())
                .filter(service_request::Column::ServiceId.is_in(service_ids))
                .order_by_asc(service_request::Column::CreatedAt)
                .all(db)
                .await?)
        }
    }
}

/// Requests visible to `user` on the shared listing; admins use their own console.
pub async fn list_for_user(db: &DatabaseConnection, user: &user::Model) -> Result<Vec<service_request::Model>, ServiceError> {
    match user.role {
        Role::Customer => list_for_customer(db, user.id, None).await,
        Role::Professional => assigned_to(db, user.id, None).await,
        Role::Admin => Err(ServiceError::validation("admins should use the admin bookings listing")),
    }
}

#[instrument(skip(db, professional), fields(professional_id = professional.id))]
pub async fn accept(
    db: &DatabaseConnection,
    professional: &user::Model,
    id: i32,
) -> Result<service_request::Model, ServiceError> {
    let found = get(db, id).await?;
    if found.status != RequestStatus::Pending {
        return Err(ServiceError::validation(format!("cannot accept a {} request", found.status)));
    }
    if !professional.is_approved {
        return Err(ServiceError::Forbidden("your account is pending approval".into()));
    }
    if matches!(found.professional_id, Some(pid) if pid != professional.id) {
        return Err(ServiceError::Forbidden("request is assigned to another professional".into()));
    }
    let mut am: service_request::ActiveModel = found.into();
    am.professional_id = Set(Some(professional.id));
    am.status = Set(RequestStatus::Accepted);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(request_id = id, professional_id = professional.id, event = "request_accepted", "service request accepted");
    Ok(updated)
}

#[instrument(skip(db, professional, reason), fields(professional_id = professional.id))]
pub async fn reject(
    db: &DatabaseConnection,
    professional: &user::Model,
    id: i32,
    reason: Option<String>,
) -> Result<service_request::Model, ServiceError> {
    let found = get(db, id).await?;
    if found.status != RequestStatus::Pending {
        return Err(ServiceError::validation(format!("cannot reject a {} request", found.status)));
    }
    if matches!(found.professional_id, Some(pid) if pid != professional.id) {
        return Err(ServiceError::Forbidden("request is assigned to another professional".into()));
    }
    let mut am: service_request::ActiveModel = found.into();
    am.status = Set(RequestStatus::Rejected);
    if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
        am.notes = Set(Some(reason));
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(request_id = id, professional_id = professional.id, event = "request_rejected", "service request rejected");
    Ok(updated)
}

/// Complete an accepted request. The final price is the given one, else the
/// price already on the request, else the service base price.
#[instrument(skip(db, professional), fields(professional_id = professional.id))]
pub async fn complete(
    db: &DatabaseConnection,
    professional: &user::Model,
    id: i32,
    final_price: Option<f64>,
) -> Result<service_request::Model, ServiceError> {
    let found = get(db, id).await?;
    if found.status != RequestStatus::Accepted {
        return Err(ServiceError::validation(format!("cannot complete a {} request", found.status)));
    }
    if found.professional_id != Some(professional.id) {
        return Err(ServiceError::Forbidden("request is not assigned to you".into()));
    }
    if let Some(price) = final_price {
        catalog::validate_price(price)?;
    }
    let price = match final_price.or(found.final_price) {
        Some(p) => p,
        None => catalog::Entity::find_by_id(found.service_id)
            .one(db)
            .await?
            .map(|s| s.base_price)
            .unwrap_or(0.0),
    };

    let txn = db.begin().await?;
    let now = Utc::now();
    let mut am: service_request::ActiveModel = found.into();
    am.status = Set(RequestStatus::Completed);
    am.final_price = Set(Some(price));
    am.completed_at = Set(Some(now.into()));
    am.updated_at = Set(now.into());
    let updated = am.update(&txn).await?;

    let pro = user::Entity::find_by_id(professional.id)
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("professional"))?;
    let jobs = pro.total_jobs;
    let mut pro_am: user::ActiveModel = pro.into();
    pro_am.total_jobs = Set(jobs + 1);
    pro_am.update(&txn).await?;
    txn.commit().await?;

    info!(request_id = id, professional_id = professional.id, final_price = price, event = "request_completed", "service request completed");
    Ok(updated)
}

/// Every request, newest first (admin bookings).
pub async fn admin_list(
    db: &DatabaseConnection,
    status: Option<RequestStatus>,
) -> Result<Vec<service_request::Model>, ServiceError> {
    let mut query = service_request::Entity::find()
        .order_by_desc(service_request::Column::CreatedAt)
        .order_by_desc(service_request::Column::Id);
    if let Some(status) = status {
        query = query.filter(service_request::Column::Status.eq(status));
    }
    Ok(query.all(db).await?)
}

/// Admin override to any valid status; `completed` stamps `completed_at`.
#[instrument(skip(db))]
pub async fn admin_set_status(db: &DatabaseConnection, id: i32, status: &str) -> Result<service_request::Model, ServiceError> {
    let status = RequestStatus::parse(status).ok_or_else(|| ServiceError::validation(format!("invalid status: {}", status)))?;
    let found = get(db, id).await?;
    let now = Utc::now();
    let mut am: service_request::ActiveModel = found.into();
    am.status = Set(status);
    if status == RequestStatus::Completed {
        am.completed_at = Set(Some(now.into()));
    }
    am.updated_at = Set(now.into());
    let updated = am.update(db).await?;
    info!(request_id = id, status = %status, event = "request_status_override", "admin changed request status");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, make_approved_professional, make_request, make_service, make_user, set_status};

    fn create_input(service_id: i32) -> CreateRequestInput {
        CreateRequestInput {
            service_id,
            preferred_date: "2024-09-01".into(),
            address: "5 Oak Road".into(),
            description: Some("leaky tap".into()),
            price: None,
            professional_id: None,
        }
    }

    #[tokio::test]
    async fn create_validates_service_date_and_professional() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let unapproved = make_user(&db, "u@x.com", Role::Professional, &["Plumbing"]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;
        let off = make_service(&db, "Roofing", "Repair", 500.0).await;
        crate::catalog::update(&db, off.id, crate::catalog::ServiceUpdate { is_active: Some(false), ..Default::default() }).await?;

        assert!(matches!(create_for_customer(&db, c.id, create_input(999)).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(create_for_customer(&db, c.id, create_input(off.id)).await, Err(ServiceError::Validation(_))));
        let bad_date = CreateRequestInput { preferred_date: "tomorrow".into(), ..create_input(s.id) };
        assert!(matches!(create_for_customer(&db, c.id, bad_date).await, Err(ServiceError::Model(_))));
        let bad_pro = CreateRequestInput { professional_id: Some(unapproved.id), ..create_input(s.id) };
        assert!(matches!(create_for_customer(&db, c.id, bad_pro).await, Err(ServiceError::Validation(_))));

        let created = create_for_customer(&db, c.id, create_input(s.id)).await?;
        assert_eq!(created.status, RequestStatus::Pending);
        assert_eq!(created.notes.as_deref(), Some("leaky tap"));
        Ok(())
    }

    #[tokio::test]
    async fn customer_update_and_cancel_rules() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let other = make_user(&db, "o@x.com", Role::Customer, &[]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;
        let r = make_request(&db, c.id, s.id, None).await;

        let upd = UpdateRequestInput { address: Some("9 New St".into()), price: Some(70.0), ..Default::default() };
        assert!(matches!(update_by_customer(&db, other.id, r.id, upd.clone()).await, Err(ServiceError::NotFound(_))));
        let updated = update_by_customer(&db, c.id, r.id, upd.clone()).await?;
        assert_eq!(updated.address, "9 New St");
        assert_eq!(updated.final_price, Some(70.0));

        let accepted = set_status(&db, updated, RequestStatus::Accepted).await;
        assert!(matches!(update_by_customer(&db, c.id, accepted.id, upd).await, Err(ServiceError::Validation(_))));

        assert!(matches!(cancel(&db, other.id, accepted.id).await, Err(ServiceError::NotFound(_))));
        let cancelled = cancel(&db, c.id, accepted.id).await?;
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        assert!(matches!(cancel(&db, c.id, accepted.id).await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn accept_reject_complete_flow() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let p = make_approved_professional(&db, "p@x.com", &["Plumbing"]).await;
        let p2 = make_approved_professional(&db, "p2@x.com", &["Plumbing"]).await;
        let pending_pro = make_user(&db, "new@x.com", Role::Professional, &["Plumbing"]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;

        let r = make_request(&db, c.id, s.id, None).await;
        assert!(matches!(accept(&db, &pending_pro, r.id).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(complete(&db, &p, r.id, None).await, Err(ServiceError::Validation(_))));
        let accepted = accept(&db, &p, r.id).await?;
        assert_eq!(accepted.professional_id, Some(p.id));
        assert!(matches!(accept(&db, &p2, r.id).await, Err(ServiceError::Validation(_))));
        assert!(matches!(complete(&db, &p2, r.id, None).await, Err(ServiceError::Forbidden(_))));

        let done = complete(&db, &p, r.id, None).await?;
        assert_eq!(done.status, RequestStatus::Completed);
        assert_eq!(done.final_price, Some(50.0));
        // Status is checked before approval.
        assert!(matches!(accept(&db, &pending_pro, r.id).await, Err(ServiceError::Validation(_))));
        assert!(done.completed_at.is_some());
        assert_eq!(crate::users::get(&db, p.id).await?.total_jobs, 1);

        let preassigned = make_request(&db, c.id, s.id, Some(p2.id)).await;
        assert!(matches!(accept(&db, &p, preassigned.id).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(reject(&db, &p, preassigned.id, None).await, Err(ServiceError::Forbidden(_))));
        let rejected = reject(&db, &p2, preassigned.id, Some("fully booked".into())).await?;
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.notes.as_deref(), Some("fully booked"));

        let priced = make_request(&db, c.id, s.id, None).await;
        accept(&db, &p, priced.id).await?;
        let done = complete(&db, &p, priced.id, Some(75.5)).await?;
        assert_eq!(done.final_price, Some(75.5));
        Ok(())
    }

    #[tokio::test]
    async fn professional_queues() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let p = make_approved_professional(&db, "p@x.com", &["Plumbing"]).await;
        let plumbing = make_service(&db, "Plumbing", "Repair", 50.0).await;
        let painting = make_service(&db, "Painting", "Decor", 90.0).await;
        make_request(&db, c.id, plumbing.id, None).await;
        make_request(&db, c.id, painting.id, None).await;
        make_request(&db, c.id, plumbing.id, Some(p.id)).await;

        let open = list_for_professional(&db, &p, ProfessionalQueue::Open).await?;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].service_id, plumbing.id);
        let mine = list_for_professional(&db, &p, ProfessionalQueue::parse(None)?).await?;
        assert_eq!(mine.len(), 1);
        assert!(ProfessionalQueue::parse(Some("bogus")).is_err());
        assert_eq!(ProfessionalQueue::parse(Some("OPEN"))?, ProfessionalQueue::Open);

        assert_eq!(list_for_user(&db, &c).await?.len(), 3);
        assert_eq!(list_for_user(&db, &p).await?.len(), 1);
        let admin = make_user(&db, "a@x.com", Role::Admin, &[]).await;
        assert!(matches!(list_for_user(&db, &admin).await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn admin_override() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;
        let r = make_request(&db, c.id, s.id, None).await;

        assert!(matches!(admin_set_status(&db, r.id, "finished").await, Err(ServiceError::Validation(_))));
        let done = admin_set_status(&db, r.id, "completed").await?;
        assert!(done.completed_at.is_some());
        assert_eq!(admin_list(&db, parse_status_filter(Some("completed"))?).await?.len(), 1);
        assert_eq!(admin_list(&db, parse_status_filter(Some("all"))?).await?.len(), 1);
        assert_eq!(admin_list(&db, Some(RequestStatus::Pending)).await?.len(), 0);
        Ok(())
    }
}
