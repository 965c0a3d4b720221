//! Startup seeding.
use tracing::info;

use models::user::{NewUser, Role};

use crate::auth::domain::AuthUser;
use crate::auth::errors::AuthError;
use crate::auth::hash_password;
use crate::auth::repository::AuthRepository;

/// Create the configured admin account unless a user with that email exists.
/// Returns the existing or newly created user.
pub async fn ensure_admin<R: AuthRepository>(repo: &R, cfg: &configs::AdminConfig) -> Result<AuthUser, AuthError> {
    if let Some(existing) = repo.find_user_by_email(&cfg.email.trim().to_lowercase()).await? {
        if existing.role != Role::Admin {
            tracing::warn!(email = %existing.email, role = %existing.role, "admin email belongs to a non-admin account");
        }
        return Ok(existing);
    }
    let hash = hash_password(&cfg.password)?;
    let admin = repo
        .create_user_with_password(
            NewUser { name: cfg.name.clone(), email: cfg.email.clone(), role: Role::Admin, ..Default::default() },
            hash,
            "argon2".into(),
        )
        .await?;
    info!(user_id = admin.id, email = %admin.email, event = "admin_seeded", "created admin account");
    Ok(admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let repo = MockAuthRepository::default();
        let cfg = configs::AdminConfig::default();
        let first = ensure_admin(&repo, &cfg).await.unwrap();
        assert_eq!(first.role, Role::Admin);
        let second = ensure_admin(&repo, &cfg).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(repo.get_credentials(first.id).await.unwrap().is_some());
    }
}
