use async_trait::async_trait;

use models::user::NewUser;

use super::domain::{AuthUser, Credentials};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: i32) -> Result<Option<AuthUser>, AuthError>;

    /// Insert the user row and its credentials together.
    async fn create_user_with_password(
        &self,
        new: NewUser,
        password_hash: String,
        password_algorithm: String,
    ) -> Result<AuthUser, AuthError>;

    async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: i32, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;

    /// Stamp `last_login` and bump `login_count`.
    async fn record_login(&self, user_id: i32) -> Result<(), AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Mutex;

    use models::user::Role;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>, // key: email
        creds: Mutex<HashMap<i32, Credentials>>, // key: user_id
        logins: Mutex<HashMap<i32, u32>>,
        next_id: AtomicI32,
    }

    impl MockAuthRepository {
        pub fn login_count(&self, user_id: i32) -> u32 {
            self.logins.lock().unwrap().get(&user_id).copied().unwrap_or(0)
        }

        /// Flip `is_active` to simulate an admin block.
        pub fn set_active(&self, email: &str, active: bool) {
            if let Some(u) = self.users.lock().unwrap().get_mut(email) {
                u.is_active = active;
            }
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(&email.trim().to_lowercase()).cloned())
        }

        async fn find_user_by_id(&self, id: i32) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.id == id).cloned())
        }

        async fn create_user_with_password(
            &self,
            new: NewUser,
            password_hash: String,
            password_algorithm: String,
        ) -> Result<AuthUser, AuthError> {
            let email = new.email.trim().to_lowercase();
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&email) {
                return Err(AuthError::Conflict);
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let user = AuthUser {
                id,
                name: new.name,
                email: email.clone(),
                role: new.role,
                is_active: true,
                is_approved: new.role != Role::Professional,
            };
            users.insert(email, user.clone());
            self.creds.lock().unwrap().insert(id, Credentials { user_id: id, password_hash, password_algorithm });
            Ok(user)
        }

        async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().unwrap();
            Ok(creds.get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: i32, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let mut creds = self.creds.lock().unwrap();
            let c = Credentials { user_id, password_hash, password_algorithm };
            creds.insert(user_id, c.clone());
            Ok(c)
        }

        async fn record_login(&self, user_id: i32) -> Result<(), AuthError> {
            *self.logins.lock().unwrap().entry(user_id).or_default() += 1;
            Ok(())
        }
    }
}
