use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};

use models::user::NewUser;

use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

#[derive(Clone)]
pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::find_by_email(&self.db, email).await?;
        Ok(res.as_ref().map(AuthUser::from))
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.as_ref().map(AuthUser::from))
    }

    async fn create_user_with_password(
        &self,
        new: NewUser,
        password_hash: String,
        password_algorithm: String,
    ) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        let created = models::user::create(&txn, new).await?;
        models::user_credentials::upsert_password(&txn, created.id, password_hash, &password_algorithm).await?;
        txn.commit().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(AuthUser::from(&created))
    }

    async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError> {
        use sea_orm::{ColumnTrait, QueryFilter};
        let res = models::user_credentials::Entity::find()
            .filter(models::user_credentials::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: i32, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = models::user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm).await?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }

    async fn record_login(&self, user_id: i32) -> Result<(), AuthError> {
        let user = models::user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?
            .ok_or(AuthError::NotFound)?;
        models::user::record_login(&self.db, user).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn new_user(email: &str) -> NewUser {
        NewUser { name: "Dana".into(), email: email.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn duplicate_insert_past_the_lookup_is_a_conflict() -> Result<(), anyhow::Error> {
        let repo = SeaOrmAuthRepository::new(get_db().await?);
        repo.create_user_with_password(new_user("dana@x.com"), "h1".into(), "argon2".into()).await?;

        // Same email racing in after the existence check passed.
        let second = repo.create_user_with_password(new_user("Dana@X.com"), "h2".into(), "argon2".into()).await;
        assert!(matches!(second, Err(AuthError::Conflict)));
        assert!(repo.find_user_by_email("dana@x.com").await?.is_some());
        Ok(())
    }
}
