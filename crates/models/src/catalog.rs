//! `services` table: the catalog of bookable services.
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::service_request;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub category: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub base_price: f64,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Requests,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Requests => Entity::has_many(service_request::Entity).into(),
        }
    }
}

impl Related<service_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_price(price: f64) -> Result<(), ModelError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ModelError::Validation("price must be a non-negative number".into()));
    }
    Ok(())
}

pub fn validate_category(category: &str) -> Result<(), ModelError> {
    if category.trim().is_empty() {
        return Err(ModelError::Validation("category required".into()));
    }
    if category.chars().count() > 50 {
        return Err(ModelError::Validation("category too long".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct NewService {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub base_price: f64,
    pub image_url: Option<String>,
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewService) -> Result<Model, ModelError> {
    crate::user::validate_name(&new.name)?;
    validate_category(&new.category)?;
    validate_price(new.base_price)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        name: Set(new.name.trim().to_string()),
        category: Set(new.category.trim().to_string()),
        description: Set(new.description),
        base_price: Set(new.base_price),
        image_url: Set(new.image_url),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}
