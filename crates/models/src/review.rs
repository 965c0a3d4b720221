use sea_orm::{entity::prelude::*, ConnectionTrait, QuerySelect, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::service_request;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub professional_id: i32,
    #[sea_orm(unique)]
    pub service_request_id: i32,
    pub rating: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Request,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Request => Entity::belongs_to(service_request::Entity)
                .from(Column::ServiceRequestId)
                .to(service_request::Column::Id)
                .into(),
        }
    }
}

impl Related<service_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_rating(rating: i32) -> Result<(), ModelError> {
    if !(1..=5).contains(&rating) {
        return Err(ModelError::Validation("rating must be between 1 and 5".into()));
    }
    Ok(())
}

/// Create the review of `service_request_id`, or overwrite rating and comment
/// when one already exists.
pub async fn upsert_for_request<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    professional_id: i32,
    service_request_id: i32,
    rating: i32,
    comment: Option<String>,
) -> Result<Model, ModelError> {
    validate_rating(rating)?;
    let now = Utc::now().into();
    let existing = Entity::find()
        .filter(Column::ServiceRequestId.eq(service_request_id))
        .one(db)
        .await?;
    match existing {
        Some(found) => {
            let mut am: ActiveModel = found.into();
            am.rating = Set(rating);
            am.comment = Set(comment);
            am.updated_at = Set(now);
            Ok(am.update(db).await?)
        }
        None => {
            let am = ActiveModel {
                user_id: Set(user_id),
                professional_id: Set(professional_id),
                service_request_id: Set(service_request_id),
                rating: Set(rating),
                comment: Set(comment),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            Ok(am.insert(db).await?)
        }
    }
}

/// Mean of all ratings, 0.0 for an empty slice.
pub fn average(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
}

/// Mean rating received by a professional, 0.0 when unreviewed.
pub async fn average_for_professional<C: ConnectionTrait>(db: &C, professional_id: i32) -> Result<f64, ModelError> {
    let ratings: Vec<i32> = Entity::find()
        .select_only()
        .column(Column::Rating)
        .filter(Column::ProfessionalId.eq(professional_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(average(&ratings))
}
