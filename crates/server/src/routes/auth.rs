use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use common::types::Message;
use models::user::{self, Role};
use service::auth::domain::{AuthSession, LoginInput, RegisterInput};
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::dashboard::DashboardCache;
use service::jobs::{ExportStore, JobContext};
use service::mail::{self, EmailSender};
use service::users::{self, ProfileUpdate};
use service::views::{UserSummary, UserView};

use crate::errors::{ApiResult, JsonApiError};

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub dashboard: DashboardCache,
    pub exports: ExportStore,
    pub jobs: JobContext,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, cfg: &configs::AppConfig) -> Self {
        Self::with_mailer(db, cfg, mail::sender_from_config(&cfg.mail))
    }

    pub fn with_mailer(db: DatabaseConnection, cfg: &configs::AppConfig, mailer: Arc<dyn EmailSender>) -> Self {
        let repo = Arc::new(SeaOrmAuthRepository::new(db.clone()));
        let ttl = Duration::from_secs(cfg.cache.ttl_secs);
        Self {
            auth: Arc::new(AuthService::new(repo, AuthConfig::from_config(&cfg.auth))),
            dashboard: DashboardCache::new(ttl),
            exports: ExportStore::new(ttl),
            jobs: JobContext { db: db.clone(), mailer, test_recipient: cfg.mail.test_recipient.clone() },
            db,
        }
    }
}

/// The authenticated caller, inserted by `require_bearer_token_state`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

#[derive(Serialize)]
pub struct SessionOutput {
    pub message: &'static str,
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

impl SessionOutput {
    fn new(message: &'static str, s: AuthSession) -> Self {
        let user = UserSummary {
            id: s.user.id,
            name: s.user.name,
            email: s.user.email,
            role: s.user.role,
            is_approved: s.user.is_approved,
        };
        Self { message, access_token: s.access_token, refresh_token: s.refresh_token, user }
    }
}

#[derive(Deserialize)]
pub struct RefreshInput {
    pub refresh_token: Option<String>,
}

#[utoipa::path(post, path = "/api/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Registered"), (status = 400, description = "Bad Request"), (status = 403, description = "Admin role requested"), (status = 409, description = "Conflict")))]
pub async fn register(
    State(state): State<ServerState>,
    Json(input): Json<RegisterInput>,
) -> ApiResult<(StatusCode, Json<SessionOutput>)> {
    let session = state.auth.register(input).await?;
    state.dashboard.invalidate().await;
    Ok((StatusCode::CREATED, Json(SessionOutput::new("Registration successful", session))))
}

#[utoipa::path(post, path = "/api/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized"), (status = 403, description = "Blocked")))]
pub async fn login(State(state): State<ServerState>, Json(input): Json<LoginInput>) -> ApiResult<Json<SessionOutput>> {
    let session = state.auth.login(input).await?;
    Ok(Json(SessionOutput::new("Login successful", session)))
}

#[utoipa::path(post, path = "/api/auth/admin/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized")))]
pub async fn admin_login(State(state): State<ServerState>, Json(input): Json<LoginInput>) -> ApiResult<Json<SessionOutput>> {
    let session = state.auth.admin_login(input).await?;
    Ok(Json(SessionOutput::new("Admin login successful", session)))
}

/// Accepts the refresh token as a bearer header or as `{"refresh_token": ...}`.
#[utoipa::path(post, path = "/api/auth/refresh", tag = "auth", responses((status = 200, description = "New access token"), (status = 401, description = "Unauthorized")))]
pub async fn refresh(
    State(state): State<ServerState>,
    headers: axum::http::HeaderMap,
    body: Option<Json<RefreshInput>>,
) -> ApiResult<Json<serde_json::Value>> {
    let token = bearer_token(&headers)
        .map(str::to_string)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| JsonApiError::unauthorized("Missing token"))?;
    let access_token = state.auth.refresh(&token).await?;
    Ok(Json(serde_json::json!({ "access_token": access_token })))
}

#[utoipa::path(get, path = "/api/auth/profile", tag = "auth", security(("bearer" = [])), responses((status = 200, description = "Profile")))]
pub async fn profile(Extension(CurrentUser(me)): Extension<CurrentUser>) -> Json<UserView> {
    Json(UserView::from(&me))
}

#[utoipa::path(put, path = "/api/auth/profile", tag = "auth", security(("bearer" = [])), request_body = crate::openapi::ProfileUpdateRequest, responses((status = 200, description = "Updated profile"), (status = 400, description = "Bad Request")))]
pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<UserView>> {
    let updated = users::update_profile(&state.db, me.id, update).await?;
    Ok(Json(UserView::from(&updated)))
}

#[utoipa::path(get, path = "/api/auth/me", tag = "auth", security(("bearer" = [])), responses((status = 200, description = "Current user")))]
pub async fn me(Extension(CurrentUser(me)): Extension<CurrentUser>) -> Json<UserView> {
    Json(UserView::from(&me))
}

/// Tokens are stateless; clients drop them.
pub async fn logout() -> Json<Message> {
    Json(Message::new("Logged out successfully"))
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Require `Authorization: Bearer <access token>` and attach the caller as `CurrentUser`.
/// Missing, malformed or expired tokens are 401; a blocked account is 403.
pub async fn require_bearer_token_state(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    let token = match bearer_token(req.headers()) {
        Some(t) => t.to_string(),
        None => {
            tracing::warn!(path = %path, "missing or malformed Authorization header");
            return Err(JsonApiError::unauthorized("Missing token"));
        }
    };

    let auth_user = state.auth.authenticate(&token).await.map_err(|e| {
        tracing::warn!(path = %path, err = %e, "token validation failed");
        JsonApiError::from(e)
    })?;
    let user = users::get(&state.db, auth_user.id)
        .await
        .map_err(|_| JsonApiError::unauthorized("User not found"))?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

fn has_role(req: &Request, role: Role) -> bool {
    req.extensions().get::<CurrentUser>().is_some_and(|CurrentUser(u)| u.role == role)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, JsonApiError> {
    if !has_role(&req, Role::Admin) {
        return Err(JsonApiError::wrong_role());
    }
    Ok(next.run(req).await)
}

pub async fn require_customer(req: Request, next: Next) -> Result<Response, JsonApiError> {
    if !has_role(&req, Role::Customer) {
        return Err(JsonApiError::wrong_role());
    }
    Ok(next.run(req).await)
}

pub async fn require_professional(req: Request, next: Next) -> Result<Response, JsonApiError> {
    if !has_role(&req, Role::Professional) {
        return Err(JsonApiError::wrong_role());
    }
    Ok(next.run(req).await)
}
