//! Service catalog: public browsing and admin management.
use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};

use models::catalog::{self, NewService};
use models::{review, service_request};

use crate::errors::ServiceError;
use crate::views::ServiceView;

/// Partial admin edit of a catalog entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Mean review rating per service id, via reviews joined to their requests.
pub async fn ratings_by_service(db: &DatabaseConnection) -> Result<HashMap<i32, f64>, ServiceError> {
    let rows: Vec<(i32, i32)> = review::Entity::find()
        .select_only()
        .column(service_request::Column::ServiceId)
        .column(review::Column::Rating)
        .join(JoinType::InnerJoin, review::Relation::Request.def())
        .into_tuple()
        .all(db)
        .await?;
    let mut grouped: HashMap<i32, Vec<i32>> = HashMap::new();
    for (service_id, rating) in rows {
        grouped.entry(service_id).or_default().push(rating);
    }
    Ok(grouped.into_iter().map(|(id, ratings)| (id, review::average(&ratings))).collect())
}

async fn with_ratings(db: &DatabaseConnection, services: Vec<catalog::Model>) -> Result<Vec<ServiceView>, ServiceError> {
    let ratings = ratings_by_service(db).await?;
    Ok(services
        .iter()
        .map(|s| ServiceView::new(s, ratings.get(&s.id).copied().unwrap_or(0.0)))
        .collect())
}

/// Active services, optionally restricted to one category.
pub async fn search(db: &DatabaseConnection, category: Option<&str>) -> Result<Vec<ServiceView>, ServiceError> {
    let mut query = catalog::Entity::find()
        .filter(catalog::Column::IsActive.eq(true))
        .order_by_asc(catalog::Column::Name);
    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        query = query.filter(catalog::Column::Category.eq(category));
    }
    let services = query.all(db).await?;
    with_ratings(db, services).await
}

pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<ServiceView>, ServiceError> {
    search(db, None).await
}

/// Every service including inactive ones (admin view).
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<ServiceView>, ServiceError> {
    let services = catalog::Entity::find().order_by_asc(catalog::Column::Id).all(db).await?;
    with_ratings(db, services).await
}

/// Distinct categories of active services, sorted.
pub async fn categories(db: &DatabaseConnection) -> Result<Vec<String>, ServiceError> {
    let cats: Vec<String> = catalog::Entity::find()
        .select_only()
        .column(catalog::Column::Category)
        .filter(catalog::Column::IsActive.eq(true))
        .into_tuple()
        .all(db)
        .await?;
    Ok(cats.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
}

pub async fn get(db: &DatabaseConnection, id: i32) -> Result<catalog::Model, ServiceError> {
    catalog::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))
}

/// An active service; inactive ones read as missing.
pub async fn get_active(db: &DatabaseConnection, id: i32) -> Result<ServiceView, ServiceError> {
    let found = get(db, id).await?;
    if !found.is_active {
        return Err(ServiceError::not_found("service"));
    }
    let mut views = with_ratings(db, vec![found]).await?;
    views.pop().ok_or_else(|| ServiceError::not_found("service"))
}

#[instrument(skip(db, new), fields(name = %new.name))]
pub async fn create(db: &DatabaseConnection, new: NewService) -> Result<catalog::Model, ServiceError> {
    let created = catalog::create(db, new).await?;
    info!(service_id = created.id, event = "service_created", "service created");
    Ok(created)
}

#[instrument(skip(db, update), fields(service_id = id))]
pub async fn update(db: &DatabaseConnection, id: i32, update: ServiceUpdate) -> Result<catalog::Model, ServiceError> {
    let found = get(db, id).await?;
    let mut am: catalog::ActiveModel = found.into();
    if let Some(name) = update.name {
        models::user::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(description) = update.description {
        am.description = Set(Some(description));
    }
    if let Some(category) = update.category {
        catalog::validate_category(&category)?;
        am.category = Set(category.trim().to_string());
    }
    if let Some(price) = update.price {
        catalog::validate_price(price)?;
        am.base_price = Set(price);
    }
    if let Some(image_url) = update.image_url {
        am.image_url = Set(Some(image_url).filter(|u| !u.trim().is_empty()));
    }
    if let Some(active) = update.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Delete a service that no request references.
#[instrument(skip(db), fields(service_id = id))]
pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    get(db, id).await?;
    let referencing = service_request::Entity::find()
        .filter(service_request::Column::ServiceId.eq(id))
        .count(db)
        .await?;
    if referencing > 0 {
        return Err(ServiceError::Conflict(format!(
            "service is referenced by {} request(s); deactivate it instead",
            referencing
        )));
    }
    catalog::Entity::delete_by_id(id).exec(db).await?;
    info!(service_id = id, event = "service_deleted", "service deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, make_approved_professional, make_request, make_service, make_user};
    use models::user::Role;

    #[tokio::test]
    async fn browse_filters_inactive_and_category() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let a = make_service(&db, "Plumbing", "Repair", 50.0).await;
        make_service(&db, "Painting", "Decor", 90.0).await;
        let hidden = make_service(&db, "Roofing", "Repair", 300.0).await;
        update(&db, hidden.id, ServiceUpdate { is_active: Some(false), ..Default::default() }).await?;

        assert_eq!(list_active(&db).await?.len(), 2);
        assert_eq!(list_all(&db).await?.len(), 3);
        let repair = search(&db, Some("Repair")).await?;
        assert_eq!(repair.iter().map(|s| s.id).collect::<Vec<_>>(), vec![a.id]);
        assert_eq!(categories(&db).await?, vec!["Decor".to_string(), "Repair".to_string()]);

        assert!(get_active(&db, a.id).await.is_ok());
        assert!(matches!(get_active(&db, hidden.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(get_active(&db, 4242).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn average_rating_is_per_service() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let p = make_approved_professional(&db, "p@x.com", &["Plumbing", "Painting"]).await;
        let plumbing = make_service(&db, "Plumbing", "Repair", 50.0).await;
        let painting = make_service(&db, "Painting", "Decor", 90.0).await;
        let r1 = make_request(&db, c.id, plumbing.id, Some(p.id)).await;
        let r2 = make_request(&db, c.id, plumbing.id, Some(p.id)).await;
        review::upsert_for_request(&db, c.id, p.id, r1.id, 4, None).await?;
        review::upsert_for_request(&db, c.id, p.id, r2.id, 5, None).await?;

        let views = list_active(&db).await?;
        let rating = |id: i32| views.iter().find(|v| v.id == id).map(|v| v.average_rating);
        assert_eq!(rating(plumbing.id), Some(4.5));
        assert_eq!(rating(painting.id), Some(0.0));
        Ok(())
    }

    #[tokio::test]
    async fn update_validates_and_delete_conflicts() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let used = make_service(&db, "Plumbing", "Repair", 50.0).await;
        let unused = make_service(&db, "Painting", "Decor", 90.0).await;
        make_request(&db, c.id, used.id, None).await;

        let bad = update(&db, used.id, ServiceUpdate { price: Some(-5.0), ..Default::default() }).await;
        assert!(matches!(bad, Err(ServiceError::Model(_))));
        let renamed = update(&db, used.id, ServiceUpdate { name: Some("Pipes".into()), price: Some(60.0), ..Default::default() }).await?;
        assert_eq!((renamed.name.as_str(), renamed.base_price), ("Pipes", 60.0));

        assert!(matches!(delete(&db, used.id).await, Err(ServiceError::Conflict(_))));
        delete(&db, unused.id).await?;
        assert!(matches!(get(&db, unused.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
