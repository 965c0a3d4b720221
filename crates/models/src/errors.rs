use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
}

/// `true` when the database rejected a write on a unique index.
pub fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl From<DbErr> for ModelError {
    fn from(e: DbErr) -> Self {
        if is_unique_violation(&e) {
            ModelError::Conflict("record already exists".into())
        } else {
            ModelError::Db(e.to_string())
        }
    }
}
