//! `/api/customer`: routes for the `customer` role.
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use service::dashboard::{self, CustomerDashboard, CustomerStats};
use service::requests::{self, CreateRequestInput, UpdateRequestInput};
use service::reviews::{self, ReviewInput};
use service::users::{self, ProfileUpdate};
use service::views::{request_detail, request_details, ProfessionalPublic, RequestDetail, ReviewView, UserView};

use super::auth::{CurrentUser, ServerState};
use crate::errors::ApiResult;

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// Name and phone only; professional fields are not editable here.
#[derive(Debug, Deserialize)]
pub struct CustomerProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[utoipa::path(get, path = "/api/customer/dashboard", tag = "customer", security(("bearer" = [])), responses((status = 200, description = "Dashboard", body = CustomerDashboard)))]
pub async fn dashboard(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> ApiResult<Json<CustomerDashboard>> {
    Ok(Json(dashboard::customer_dashboard(&state.db, &me).await?))
}

#[utoipa::path(post, path = "/api/customer/services/request", tag = "customer", security(("bearer" = [])), request_body = crate::openapi::CreateRequestBody, responses((status = 201, description = "Created", body = RequestDetail), (status = 400, description = "Bad Request"), (status = 404, description = "Unknown service")))]
pub async fn create_request(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Json(input): Json<CreateRequestInput>,
) -> ApiResult<(StatusCode, Json<RequestDetail>)> {
    let created = requests::create_for_customer(&state.db, me.id, input).await?;
    state.dashboard.invalidate().await;
    Ok((StatusCode::CREATED, Json(request_detail(&state.db, created).await?)))
}

#[utoipa::path(get, path = "/api/customer/requests/{id}", tag = "customer", security(("bearer" = [])), params(("id" = i32, Path, description = "Request id")), responses((status = 200, description = "One of your requests", body = RequestDetail), (status = 404, description = "Not yours")))]
pub async fn get_request(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> ApiResult<Json<RequestDetail>> {
    let found = requests::get_owned(&state.db, me.id, id).await?;
    Ok(Json(request_detail(&state.db, found).await?))
}

#[utoipa::path(put, path = "/api/customer/requests/{id}", tag = "customer", security(("bearer" = [])), params(("id" = i32, Path, description = "Request id")), responses((status = 200, description = "Updated", body = RequestDetail), (status = 400, description = "Not pending"), (status = 404, description = "Not yours")))]
pub async fn update_request(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateRequestInput>,
) -> ApiResult<Json<RequestDetail>> {
    let updated = requests::update_by_customer(&state.db, me.id, id, input).await?;
    Ok(Json(request_detail(&state.db, updated).await?))
}

#[utoipa::path(get, path = "/api/customer/requests", tag = "customer", security(("bearer" = [])), params(StatusQuery), responses((status = 200, description = "Own requests, newest first", body = [RequestDetail])))]
pub async fn list_requests(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Query(q): Query<StatusQuery>,
) -> ApiResult<Json<Vec<RequestDetail>>> {
    let status = requests::parse_status_filter(q.status.as_deref())?;
    let rows = requests::list_for_customer(&state.db, me.id, status).await?;
    Ok(Json(request_details(&state.db, rows).await?))
}

#[utoipa::path(post, path = "/api/customer/requests/{id}/cancel", tag = "customer", security(("bearer" = [])), params(("id" = i32, Path, description = "Request id")), responses((status = 200, description = "Cancelled"), (status = 400, description = "Not cancellable")))]
pub async fn cancel_request(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> ApiResult<Json<serde_json::Value>> {
    let cancelled = requests::cancel(&state.db, me.id, id).await?;
    state.dashboard.invalidate().await;
    let detail = request_detail(&state.db, cancelled).await?;
    Ok(Json(serde_json::json!({ "message": "Service request cancelled", "request": detail })))
}

#[utoipa::path(post, path = "/api/customer/reviews", tag = "customer", security(("bearer" = [])), request_body = crate::openapi::ReviewRequest, responses((status = 201, description = "Saved", body = ReviewView), (status = 400, description = "Bad Request"), (status = 404, description = "Not yours or not completed")))]
pub async fn submit_review(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Json(input): Json<ReviewInput>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let saved = reviews::submit(&state.db, me.id, input).await?;
    let body = serde_json::json!({ "message": "Review submitted successfully", "review": ReviewView::from(&saved) });
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(get, path = "/api/customer/profile", tag = "customer", security(("bearer" = [])), responses((status = 200, description = "Profile", body = UserView)))]
pub async fn profile(Extension(CurrentUser(me)): Extension<CurrentUser>) -> Json<UserView> {
    Json(UserView::from(&me))
}

#[utoipa::path(put, path = "/api/customer/profile", tag = "customer", security(("bearer" = [])), responses((status = 200, description = "Updated", body = UserView)))]
pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Json(body): Json<CustomerProfileUpdate>,
) -> ApiResult<Json<UserView>> {
    let update = ProfileUpdate { name: body.name, phone: body.phone, ..Default::default() };
    let updated = users::update_profile(&state.db, me.id, update).await?;
    Ok(Json(UserView::from(&updated)))
}

#[utoipa::path(get, path = "/api/customer/professionals/{service_id}", tag = "customer", security(("bearer" = [])), params(("service_id" = i32, Path, description = "Service id")), responses((status = 200, description = "Professionals offering the service", body = [ProfessionalPublic]), (status = 404, description = "Unknown service")))]
pub async fn professionals_for_service(
    State(state): State<ServerState>,
    Path(service_id): Path<i32>,
) -> ApiResult<Json<Vec<ProfessionalPublic>>> {
    let pros = users::professionals_for_service(&state.db, service_id).await?;
    Ok(Json(pros.iter().map(ProfessionalPublic::from).collect()))
}

#[utoipa::path(get, path = "/api/customer/stats", tag = "customer", security(("bearer" = [])), responses((status = 200, description = "Counters", body = CustomerStats)))]
pub async fn stats(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> ApiResult<Json<CustomerStats>> {
    Ok(Json(dashboard::customer_stats(&state.db, me.id).await?))
}
