use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use rand::rngs::OsRng;
use tracing::{info, debug, warn, instrument};

use models::user::{NewUser, Role};

use super::domain::{AuthSession, AuthUser, LoginInput, RegisterInput, TokenKind};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::tokens::TokenIssuer;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub tokens: TokenIssuer,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn from_config(cfg: &configs::AuthConfig) -> Self {
        Self { tokens: TokenIssuer::from_config(cfg), password_algorithm: "argon2".into() }
    }
}

/// Hash a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Trimmed, de-duplicated, non-empty service names in input order.
fn clean_services(services: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(services.len());
    for s in services {
        let s = s.trim().to_string();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    pub fn tokens(&self) -> &TokenIssuer { &self.cfg.tokens }

    /// Validate input, hash the password and store user and credentials.
    /// Admin accounts cannot be created this way.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_account(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        if input.name.trim().is_empty() || input.email.trim().is_empty() {
            return Err(AuthError::Validation("name, email and password are required".into()));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!("password must be at least {} characters", MIN_PASSWORD_LEN)));
        }
        let role = match input.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            None => Role::Customer,
            Some(raw) => Role::parse(raw).ok_or_else(|| AuthError::Validation(format!("invalid role: {}", raw)))?,
        };
        if role == Role::Admin {
            return Err(AuthError::Forbidden("cannot register as admin".into()));
        }
        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let hash = hash_password(&input.password)?;
        let new = NewUser {
            name: input.name,
            email: input.email,
            phone: input.phone.filter(|p| !p.trim().is_empty()),
            role,
            services: clean_services(input.services),
            experience: input.experience,
            about: input.about,
        };
        let user = self
            .repo
            .create_user_with_password(new, hash, self.cfg.password_algorithm.clone())
            .await?;
        info!(user_id = user.id, role = %user.role, event = "user_registered", "user registered");
        Ok(user)
    }

    /// Register a new user and hand back a fresh token pair.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository, tokens::TokenIssuer};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig { tokens: TokenIssuer::new("secret", 3600, 86400), password_algorithm: "argon2".into() });
    /// let input = RegisterInput { name: "Test".into(), email: "user@example.com".into(), password: "Secret123".into(), ..Default::default() };
    /// let session = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(session.user.email, "user@example.com");
    /// assert!(session.user.is_approved);
    /// ```
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        let user = self.create_account(input).await?;
        self.session_for(user)
    }

    /// Authenticate a user and issue tokens.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository, tokens::TokenIssuer};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig { tokens: TokenIssuer::new("secret", 3600, 86400), password_algorithm: "argon2".into() });
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { name: "N".into(), email: "u@e.com".into(), password: "Passw0rd".into(), ..Default::default() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(!session.access_token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.check_credentials(&input).await?;
        self.finish_login(user).await
    }

    /// As `login`, restricted to admin accounts.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn admin_login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.check_credentials(&input).await?;
        if user.role != Role::Admin {
            return Err(AuthError::Unauthorized);
        }
        self.finish_login(user).await
    }

    async fn finish_login(&self, user: AuthUser) -> Result<AuthSession, AuthError> {
        if !user.is_active {
            warn!(user_id = user.id, event = "login_blocked", "blocked user tried to log in");
            return Err(AuthError::Forbidden("account is blocked".into()));
        }
        self.repo.record_login(user.id).await?;
        info!(user_id = user.id, event = "login", "user logged in");
        self.session_for(user)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.cfg.tokens.verify(refresh_token, TokenKind::Refresh)?;
        let user = self.load_active(claims.user_id()).await?;
        self.cfg.tokens.issue(user.id, user.role, TokenKind::Access)
    }

    /// Resolve an access token to its user; the user must still exist and be active.
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.cfg.tokens.verify(access_token, TokenKind::Access)?;
        self.load_active(claims.user_id()).await
    }

    async fn load_active(&self, user_id: Option<i32>) -> Result<AuthUser, AuthError> {
        let id = user_id.ok_or(AuthError::Unauthorized)?;
        let user = self.repo.find_user_by_id(id).await?.ok_or(AuthError::Unauthorized)?;
        if !user.is_active {
            return Err(AuthError::Forbidden("account is blocked".into()));
        }
        Ok(user)
    }

    async fn check_credentials(&self, input: &LoginInput) -> Result<AuthUser, AuthError> {
        let user = self.repo
            .find_user_by_email(&input.email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !verify_password(&input.password, &cred.password_hash)? {
            return Err(AuthError::Unauthorized);
        }
        Ok(user)
    }

    fn session_for(&self, user: AuthUser) -> Result<AuthSession, AuthError> {
        let access_token = self.cfg.tokens.issue(user.id, user.role, TokenKind::Access)?;
        let refresh_token = self.cfg.tokens.issue(user.id, user.role, TokenKind::Refresh)?;
        Ok(AuthSession { user, access_token, refresh_token })
    }
}
