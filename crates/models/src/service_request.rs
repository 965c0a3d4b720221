use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{catalog, user};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl RequestStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Still in progress: waiting for or being worked by a professional.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub customer_id: i32,
    pub service_id: i32,
    pub professional_id: Option<i32>,
    pub status: RequestStatus,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    pub preferred_date: Date,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub final_price: Option<f64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Customer,
    Professional,
    Service,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Customer => Entity::belongs_to(user::Entity)
                .from(Column::CustomerId)
                .to(user::Column::Id)
                .into(),
            Relation::Professional => Entity::belongs_to(user::Entity)
                .from(Column::ProfessionalId)
                .to(user::Column::Id)
                .into(),
            Relation::Service => Entity::belongs_to(catalog::Entity)
                .from(Column::ServiceId)
                .to(catalog::Column::Id)
                .into(),
        }
    }
}

impl Related<catalog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Parse a `YYYY-MM-DD` wire date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ModelError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ModelError::Validation("invalid date format, expected YYYY-MM-DD".into()))
}

#[derive(Debug, Clone)]
pub struct NewServiceRequest {
    pub customer_id: i32,
    pub service_id: i32,
    pub professional_id: Option<i32>,
    pub address: String,
    pub preferred_date: NaiveDate,
    pub notes: Option<String>,
    pub final_price: Option<f64>,
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewServiceRequest) -> Result<Model, ModelError> {
    if new.address.trim().is_empty() {
        return Err(ModelError::Validation("address required".into()));
    }
    if let Some(price) = new.final_price {
        catalog::validate_price(price)?;
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        customer_id: Set(new.customer_id),
        service_id: Set(new.service_id),
        professional_id: Set(new.professional_id),
        status: Set(RequestStatus::Pending),
        address: Set(new.address.trim().to_string()),
        preferred_date: Set(new.preferred_date),
        notes: Set(new.notes),
        final_price: Set(new.final_price),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}
