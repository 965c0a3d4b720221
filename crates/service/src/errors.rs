use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

    /// Human-readable message without the variant prefix, used in JSON error bodies.
    pub fn message(&self) -> String {
        match self {
            Self::Validation(m) | Self::NotFound(m) | Self::Conflict(m) | Self::Forbidden(m) => m.clone(),
            Self::Db(_) => "internal database error".to_string(),
            Self::Internal(_) => "internal error".to_string(),
            Self::Model(models::errors::ModelError::Validation(m) | models::errors::ModelError::Conflict(m)) => m.clone(),
            Self::Model(models::errors::ModelError::Db(_)) => "internal database error".to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        if models::errors::is_unique_violation(&e) {
            Self::Conflict("record already exists".into())
        } else {
            Self::Db(e.to_string())
        }
    }
}
