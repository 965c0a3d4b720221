use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};

use models::review;
use models::service_request::{self, RequestStatus};
use models::user;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub service_request_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Store the recomputed mean rating on the professional and return it.
pub async fn recompute_average<C: sea_orm::ConnectionTrait>(db: &C, professional_id: i32) -> Result<f64, ServiceError> {
    let avg = review::average_for_professional(db, professional_id).await?;
    if let Some(pro) = user::Entity::find_by_id(professional_id).one(db).await? {
        let mut am: user::ActiveModel = pro.into();
        am.average_rating = Set(avg);
        am.updated_at = Set(Utc::now().into());
        am.update(db).await?;
    }
    Ok(avg)
}

/// Create or replace the customer's review of one of their completed requests.
#[instrument(skip(db, input), fields(request_id = input.service_request_id))]
pub async fn submit(db: &DatabaseConnection, customer_id: i32, input: ReviewInput) -> Result<review::Model, ServiceError> {
    let request = service_request::Entity::find_by_id(input.service_request_id)
        .one(db)
        .await?
        .filter(|r| r.customer_id == customer_id && r.status == RequestStatus::Completed)
        .ok_or_else(|| ServiceError::NotFound("service request not found or not completed".into()))?;
    let professional_id = request
        .professional_id
        .ok_or_else(|| ServiceError::validation("no professional assigned to this request"))?;
    review::validate_rating(input.rating)?;

    let txn = db.begin().await?;
    let saved = review::upsert_for_request(
        &txn,
        customer_id,
        professional_id,
        request.id,
        input.rating,
        input.comment.filter(|c| !c.trim().is_empty()),
    )
    .await?;
    let avg = recompute_average(&txn, professional_id).await?;
    txn.commit().await?;

    info!(request_id = request.id, professional_id, average_rating = avg, event = "review_saved", "review saved");
    Ok(saved)
}

pub async fn count_by_customer(db: &DatabaseConnection, customer_id: i32) -> Result<u64, ServiceError> {
    Ok(review::Entity::find()
        .filter(review::Column::UserId.eq(customer_id))
        .count(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, make_approved_professional, make_request, make_service, make_user, set_status};
    use models::user::Role;

    #[tokio::test]
    async fn review_rules_and_average() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let other = make_user(&db, "o@x.com", Role::Customer, &[]).await;
        let p = make_approved_professional(&db, "p@x.com", &["Plumbing"]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;

        let pending = make_request(&db, c.id, s.id, Some(p.id)).await;
        let input = |id, rating| ReviewInput { service_request_id: id, rating, comment: Some("ok".into()) };
        assert!(matches!(submit(&db, c.id, input(pending.id, 5)).await, Err(ServiceError::NotFound(_))));

        let done = set_status(&db, pending, RequestStatus::Completed).await;
        assert!(matches!(submit(&db, other.id, input(done.id, 5)).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(submit(&db, c.id, input(done.id, 0)).await, Err(ServiceError::Model(_))));

        let unassigned = set_status(&db, make_request(&db, c.id, s.id, None).await, RequestStatus::Completed).await;
        assert!(matches!(submit(&db, c.id, input(unassigned.id, 4)).await, Err(ServiceError::Validation(_))));

        submit(&db, c.id, input(done.id, 2)).await?;
        let second = set_status(&db, make_request(&db, c.id, s.id, Some(p.id)).await, RequestStatus::Completed).await;
        submit(&db, c.id, input(second.id, 5)).await?;
        assert_eq!(crate::users::get(&db, p.id).await?.average_rating, 3.5);

        // Re-reviewing replaces rather than adds.
        submit(&db, c.id, input(done.id, 4)).await?;
        assert_eq!(crate::users::get(&db, p.id).await?.average_rating, 4.5);
        assert_eq!(count_by_customer(&db, c.id).await?, 2);
        Ok(())
    }
}
