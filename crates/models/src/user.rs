use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user_credentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[default]
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "professional")]
    Professional,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "customer" => Some(Role::Customer),
            "professional" => Some(Role::Professional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
            Role::Professional => "professional",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_approved: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub last_login: Option<DateTimeWithTimeZone>,
    pub login_count: i32,
    /// JSON array of service names offered by a professional.
    #[sea_orm(column_type = "Text", nullable)]
    pub services: Option<String>,
    pub experience: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub about: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub average_rating: f64,
    pub total_jobs: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Credentials,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Credentials => Entity::has_one(user_credentials::Entity).into(),
        }
    }
}

impl Related<user_credentials::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Credentials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decoded `services` column; malformed or empty values read as no services.
    pub fn services_list(&self) -> Vec<String> {
        decode_services(self.services.as_deref())
    }

    pub fn offers(&self, service_name: &str) -> bool {
        self.services_list().iter().any(|s| s == service_name)
    }
}

pub fn decode_services(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(s).ok()).unwrap_or_default()
}

pub fn encode_services(services: &[String]) -> Option<String> {
    if services.is_empty() {
        return None;
    }
    serde_json::to_string(services).ok()
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ModelError::Validation("invalid email".into()));
    }
    if email.len() > 120 {
        return Err(ModelError::Validation("email too long".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("name required".into()));
    }
    if name.chars().count() > 100 {
        return Err(ModelError::Validation("name too long".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub services: Vec<String>,
    pub experience: Option<i32>,
    pub about: Option<String>,
}

/// Insert a user. Professionals start unapproved and keep their profile
/// fields; other roles are approved immediately and drop them.
pub async fn create<C: ConnectionTrait>(db: &C, new: NewUser) -> Result<Model, ModelError> {
    validate_name(&new.name)?;
    validate_email(&new.email)?;
    if let Some(exp) = new.experience {
        if exp < 0 {
            return Err(ModelError::Validation("experience must be >= 0".into()));
        }
    }
    let is_professional = new.role == Role::Professional;
    let now = Utc::now().into();
    let am = ActiveModel {
        name: Set(new.name.trim().to_string()),
        email: Set(new.email.trim().to_lowercase()),
        phone: Set(new.phone),
        role: Set(new.role),
        is_active: Set(true),
        is_approved: Set(!is_professional),
        created_at: Set(now),
        updated_at: Set(now),
        last_login: Set(None),
        login_count: Set(0),
        services: Set(if is_professional { encode_services(&new.services) } else { None }),
        experience: Set(if is_professional { new.experience } else { None }),
        about: Set(if is_professional { new.about } else { None }),
        average_rating: Set(0.0),
        total_jobs: Set(0),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?)
}

pub async fn record_login<C: ConnectionTrait>(db: &C, user: Model) -> Result<Model, ModelError> {
    let count = user.login_count;
    let mut am: ActiveModel = user.into();
    am.last_login = Set(Some(Utc::now().into()));
    am.login_count = Set(count + 1);
    Ok(am.update(db).await?)
}
