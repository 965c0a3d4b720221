//! `/api/admin`: the admin console. Every mutation here drops the cached
//! dashboard counters.
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use common::types::Message;
use models::catalog::NewService;
use models::user::Role;
use service::auth::domain::RegisterInput;
use service::catalog::{self, ServiceUpdate};
use service::dashboard::AdminStats;
use service::jobs::{export, ExportStatus, JobKind};
use service::pagination::{Page, Pagination};
use service::requests;
use service::users::{self, AdminUserUpdate, ProfessionalAction};
use service::views::{request_detail, request_details, RequestDetail, ServiceView, UserSummary, UserView};

use super::auth::ServerState;
use super::customer::StatusQuery;
use crate::errors::{ApiResult, JsonApiError};

#[utoipa::path(get, path = "/api/admin/dashboard", tag = "admin", security(("bearer" = [])), responses((status = 200, description = "Platform counters", body = AdminStats)))]
pub async fn dashboard(State(state): State<ServerState>) -> ApiResult<Json<AdminStats>> {
    Ok(Json(state.dashboard.admin_stats(&state.db).await?))
}

// ---- services ----

#[derive(Debug, Deserialize)]
pub struct NewServiceBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
}

/// `true`, `false`, `"true"` or `"false"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseBool {
    Bool(bool),
    Text(String),
}

impl LooseBool {
    fn parse(&self) -> Result<bool, JsonApiError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Self::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            Self::Text(s) => Err(JsonApiError::bad_request(format!("invalid is_active value: {}", s))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceUpdateBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub is_active: Option<LooseBool>,
}

#[utoipa::path(get, path = "/api/admin/services", tag = "admin", security(("bearer" = [])), responses((status = 200, description = "All services", body = [ServiceView])))]
pub async fn list_services(State(state): State<ServerState>) -> ApiResult<Json<Vec<ServiceView>>> {
    Ok(Json(catalog::list_all(&state.db).await?))
}

#[utoipa::path(post, path = "/api/admin/services", tag = "admin", security(("bearer" = [])), request_body = crate::openapi::NewServiceRequest, responses((status = 201, description = "Created"), (status = 400, description = "Bad Request")))]
pub async fn create_service(
    State(state): State<ServerState>,
    Json(body): Json<NewServiceBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let (Some(name), Some(category), Some(price)) = (body.name, body.category, body.price) else {
        return Err(JsonApiError::bad_request("name, category and price are required"));
    };
    let new = NewService { name, category, description: body.description, base_price: price, image_url: body.image_url };
    let created = catalog::create(&state.db, new).await?;
    state.dashboard.invalidate().await;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "message": "Service created successfully", "id": created.id }))))
}

#[utoipa::path(put, path = "/api/admin/services/{id}", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "Service id")), responses((status = 200, description = "Updated", body = ServiceView), (status = 404, description = "Not Found")))]
pub async fn update_service(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
    Json(body): Json<ServiceUpdateBody>,
) -> ApiResult<Json<ServiceView>> {
    let is_active = body.is_active.as_ref().map(LooseBool::parse).transpose()?;
    let update = ServiceUpdate {
        name: body.name,
        description: body.description,
        category: body.category,
        price: body.price,
        image_url: body.image_url,
        is_active,
    };
    let updated = catalog::update(&state.db, id, update).await?;
    state.dashboard.invalidate().await;
    let rating = catalog::ratings_by_service(&state.db).await?.get(&id).copied().unwrap_or(0.0);
    Ok(Json(ServiceView::new(&updated, rating)))
}

#[utoipa::path(delete, path = "/api/admin/services/{id}", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "Service id")), responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found"), (status = 409, description = "Referenced by requests")))]
pub async fn delete_service(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Json<Message>> {
    catalog::delete(&state.db, id).await?;
    state.dashboard.invalidate().await;
    Ok(Json(Message::new("Service deleted successfully")))
}

// ---- bookings ----

#[derive(Debug, Deserialize)]
pub struct BookingStatusBody {
    pub status: String,
}

#[utoipa::path(get, path = "/api/admin/bookings", tag = "admin", security(("bearer" = [])), params(StatusQuery), responses((status = 200, description = "All requests", body = [RequestDetail])))]
pub async fn list_bookings(
    State(state): State<ServerState>,
    Query(q): Query<StatusQuery>,
) -> ApiResult<Json<Vec<RequestDetail>>> {
    let status = requests::parse_status_filter(q.status.as_deref())?;
    let rows = requests::admin_list(&state.db, status).await?;
    Ok(Json(request_details(&state.db, rows).await?))
}

#[utoipa::path(put, path = "/api/admin/bookings/{id}", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "Request id")), responses((status = 200, description = "Updated", body = RequestDetail), (status = 400, description = "Invalid status"), (status = 404, description = "Not Found")))]
pub async fn update_booking(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
    Json(body): Json<BookingStatusBody>,
) -> ApiResult<Json<RequestDetail>> {
    let updated = requests::admin_set_status(&state.db, id, &body.status).await?;
    state.dashboard.invalidate().await;
    Ok(Json(request_detail(&state.db, updated).await?))
}

// ---- users ----

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[utoipa::path(get, path = "/api/admin/users", tag = "admin", security(("bearer" = [])), params(UserListQuery), responses((status = 200, description = "Paged users"), (status = 400, description = "Invalid role")))]
pub async fn list_users(
    State(state): State<ServerState>,
    Query(q): Query<UserListQuery>,
) -> ApiResult<Json<Page<UserView>>> {
    let role = match q.role.as_deref().map(str::trim).filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case("all")) {
        None => None,
        Some(raw) => Some(Role::parse(raw).ok_or_else(|| JsonApiError::bad_request(format!("invalid role: {}", raw)))?),
    };
    let defaults = Pagination::default();
    let opts = Pagination { page: q.page.unwrap_or(defaults.page), per_page: q.per_page.unwrap_or(defaults.per_page) };
    let (rows, total) = users::list(&state.db, role, opts).await?;
    Ok(Json(Page::new(rows.iter().map(UserView::from).collect(), total, opts)))
}

#[utoipa::path(post, path = "/api/admin/users", tag = "admin", security(("bearer" = [])), request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Created"), (status = 403, description = "Admin role requested"), (status = 409, description = "Conflict")))]
pub async fn create_user(
    State(state): State<ServerState>,
    Json(input): Json<RegisterInput>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let created = state.auth.create_account(input).await?;
    state.dashboard.invalidate().await;
    let user = UserSummary {
        id: created.id,
        name: created.name,
        email: created.email,
        role: created.role,
        is_approved: created.is_approved,
    };
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "message": "User created successfully", "user": user }))))
}

#[utoipa::path(put, path = "/api/admin/users/{id}", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "User id")), responses((status = 200, description = "Updated", body = UserView), (status = 404, description = "Not Found"), (status = 409, description = "Email taken")))]
pub async fn update_user(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
    Json(update): Json<AdminUserUpdate>,
) -> ApiResult<Json<UserView>> {
    let updated = users::admin_update(&state.db, id, update).await?;
    state.dashboard.invalidate().await;
    Ok(Json(UserView::from(&updated)))
}

#[utoipa::path(delete, path = "/api/admin/users/{id}", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "User id")), responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found")))]
pub async fn delete_user(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Json<Message>> {
    users::delete(&state.db, id).await?;
    state.dashboard.invalidate().await;
    Ok(Json(Message::new("User deleted successfully")))
}

#[utoipa::path(put, path = "/api/admin/users/{id}/toggle-status", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "User id")), responses((status = 200, description = "Approval flipped"), (status = 404, description = "Not Found")))]
pub async fn toggle_user_status(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Json<serde_json::Value>> {
    let updated = users::toggle_approval(&state.db, id).await?;
    state.dashboard.invalidate().await;
    Ok(Json(serde_json::json!({ "message": "User status updated", "is_approved": updated.is_approved })))
}

// ---- professionals ----

#[utoipa::path(get, path = "/api/admin/professionals", tag = "admin", security(("bearer" = [])), responses((status = 200, description = "All professionals", body = [UserView])))]
pub async fn list_professionals(State(state): State<ServerState>) -> ApiResult<Json<Vec<UserView>>> {
    let pros = users::list_professionals(&state.db).await?;
    Ok(Json(pros.iter().map(UserView::from).collect()))
}

#[utoipa::path(get, path = "/api/admin/professionals/pending", tag = "admin", security(("bearer" = [])), responses((status = 200, description = "Awaiting approval", body = [UserView])))]
pub async fn pending_professionals(State(state): State<ServerState>) -> ApiResult<Json<Vec<UserView>>> {
    let pros = users::pending_professionals(&state.db).await?;
    Ok(Json(pros.iter().map(UserView::from).collect()))
}

async fn moderate(state: &ServerState, id: i32, action: ProfessionalAction, message: &str) -> ApiResult<Json<serde_json::Value>> {
    let updated = users::moderate_professional(&state.db, id, action).await?;
    state.dashboard.invalidate().await;
    Ok(Json(serde_json::json!({ "message": message, "user": UserView::from(&updated) })))
}

#[utoipa::path(post, path = "/api/admin/professionals/{id}/approve", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "User id")), responses((status = 200, description = "Approved"), (status = 400, description = "Not a professional")))]
pub async fn approve_professional(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Json<serde_json::Value>> {
    moderate(&state, id, ProfessionalAction::Approve, "Professional approved").await
}

#[utoipa::path(post, path = "/api/admin/professionals/{id}/block", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "User id")), responses((status = 200, description = "Blocked"), (status = 400, description = "Not a professional")))]
pub async fn block_professional(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Json<serde_json::Value>> {
    moderate(&state, id, ProfessionalAction::Block, "Professional blocked").await
}

#[utoipa::path(post, path = "/api/admin/professionals/{id}/unblock", tag = "admin", security(("bearer" = [])), params(("id" = i32, Path, description = "User id")), responses((status = 200, description = "Unblocked"), (status = 400, description = "Not a professional")))]
pub async fn unblock_professional(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Json<serde_json::Value>> {
    moderate(&state, id, ProfessionalAction::Unblock, "Professional unblocked").await
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProfessionalSearch {
    pub q: Option<String>,
    pub service_type: Option<String>,
}

#[utoipa::path(get, path = "/api/admin/search/professionals", tag = "admin", security(("bearer" = [])), params(ProfessionalSearch), responses((status = 200, description = "Matches", body = [UserView])))]
pub async fn search_professionals(
    State(state): State<ServerState>,
    Query(q): Query<ProfessionalSearch>,
) -> ApiResult<Json<Vec<UserView>>> {
    let pros = users::search_professionals(&state.db, q.q.as_deref(), q.service_type.as_deref()).await?;
    Ok(Json(pros.iter().map(UserView::from).collect()))
}

// ---- exports and jobs ----

#[utoipa::path(post, path = "/api/admin/exports/service-requests", tag = "admin", security(("bearer" = [])), responses((status = 202, description = "Export started")))]
pub async fn start_export(State(state): State<ServerState>) -> (StatusCode, Json<serde_json::Value>) {
    let task_id = state.exports.start(state.db.clone()).await;
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "message": "Export started", "task_id": task_id })))
}

#[utoipa::path(get, path = "/api/admin/exports/{task_id}", tag = "admin", security(("bearer" = [])), params(("task_id" = String, Path, description = "Export task id")), responses((status = 200, description = "CSV file", content_type = "text/csv"), (status = 202, description = "Still running"), (status = 404, description = "Unknown or expired"), (status = 500, description = "Generation failed")))]
pub async fn get_export(State(state): State<ServerState>, Path(task_id): Path<String>) -> Response {
    match state.exports.status(&task_id).await {
        Some(ExportStatus::Ready(csv)) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", export::FILE_NAME)),
            ],
            csv.as_str().to_owned(),
        )
            .into_response(),
        Some(ExportStatus::Running) => {
            (StatusCode::ACCEPTED, Json(serde_json::json!({ "status": "running" }))).into_response()
        }
        Some(ExportStatus::Failed(msg)) => {
            JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("export failed: {}", msg)).into_response()
        }
        None => JsonApiError::not_found("export not found or expired").into_response(),
    }
}

fn trigger(state: &ServerState, kind: JobKind, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    let task_id = state.jobs.spawn(kind);
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "message": message, "task_id": task_id })))
}

#[utoipa::path(post, path = "/api/admin/jobs/daily-reminders", tag = "admin", security(("bearer" = [])), responses((status = 202, description = "Triggered")))]
pub async fn run_daily_reminders(State(state): State<ServerState>) -> (StatusCode, Json<serde_json::Value>) {
    trigger(&state, JobKind::DailyReminders, "Daily reminders triggered")
}

#[utoipa::path(post, path = "/api/admin/jobs/monthly-reports", tag = "admin", security(("bearer" = [])), responses((status = 202, description = "Triggered")))]
pub async fn run_monthly_reports(State(state): State<ServerState>) -> (StatusCode, Json<serde_json::Value>) {
    trigger(&state, JobKind::MonthlyReports, "Monthly reports triggered")
}

#[utoipa::path(post, path = "/api/admin/jobs/test-email", tag = "admin", security(("bearer" = [])), responses((status = 202, description = "Triggered")))]
pub async fn run_test_email(State(state): State<ServerState>) -> (StatusCode, Json<serde_json::Value>) {
    trigger(&state, JobKind::TestEmail, "Test email triggered")
}
